use anyhow::Result;

fn main() -> Result<()> {
    podsync_cli::run()
}
