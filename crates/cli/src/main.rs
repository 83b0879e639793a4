fn main() -> Result<(), Box<dyn std::error::Error>> {
    weft_cli::run()
}
