use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "admitchat")]
#[command(version, about = "AdmitChat - college application assistant in your terminal")]
pub struct Cli {
    /// Relay server base URL
    #[arg(long, env = "ADMITCHAT_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    pub server: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
