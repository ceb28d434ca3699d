fn main() -> anyhow::Result<()> {
    cmtscope_cli::run()
}
