use reqwest::Client;

const DISABLE_SYSTEM_PROXY_ENV: &str = "ADMITCHAT_DISABLE_SYSTEM_PROXY";

/// Shared reqwest client. System proxies are skipped when
/// `ADMITCHAT_DISABLE_SYSTEM_PROXY` is set.
pub fn build_http_client() -> Client {
    if should_disable_system_proxy() {
        Client::builder().no_proxy().build().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Falling back to default HTTP client");
            Client::new()
        })
    } else {
        Client::new()
    }
}

fn should_disable_system_proxy() -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    cfg!(test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_proxy_skipped_in_test_builds() {
        assert!(should_disable_system_proxy());
        let _client = build_http_client();
    }
}
