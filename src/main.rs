fn main() -> anyhow::Result<()> {
    nativekit::cli::run()
}
