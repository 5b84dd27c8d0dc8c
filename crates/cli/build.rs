use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("offprint")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Offprint Contributors")
        .about("Save a column article as a self-contained offline page")
        .arg(clap::arg!(<URL> "Article metadata API URL"))
        .arg(
            clap::arg!(-o --output <FILE> "Output file (default: stdout)")
                .value_name("FILE")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(
            clap::arg!(-f --format <FORMAT> "Output format (html, json, markdown)")
                .value_name("FORMAT")
                .default_value("html")
                .value_parser(["html", "json", "markdown", "md"]),
        )
        .arg(
            clap::arg!(--assets_dir <DIR> "Directory images are downloaded to")
                .value_name("DIR")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--asset_prefix <PREFIX> "Prefix of image references written into the page").default_value("./img"))
        .arg(clap::arg!(--api_base <URL> "Base URL of the content and comment endpoints"))
        .arg(clap::arg!(--comments <NUM> "Number of comments to include").default_value("10"))
        .arg(clap::arg!(--avatar_size <SIZE> "Avatar size token").default_value("xs"))
        .arg(clap::arg!(--concurrency <NUM> "Maximum simultaneous image downloads").default_value("4"))
        .arg(clap::arg!(--strict_assets "Fail when any image cannot be downloaded"))
        .arg(clap::arg!(--timeout <SECS> "HTTP timeout in seconds").default_value("30"))
        .arg(clap::arg!(--user_agent <UA> "Custom User-Agent for HTTP requests").value_name("UA"))
        .arg(clap::arg!(--pretty "Pretty print JSON output"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    for shell in [
        clap_complete::Shell::Bash,
        clap_complete::Shell::Zsh,
        clap_complete::Shell::Fish,
        clap_complete::Shell::PowerShell,
    ] {
        clap_complete::generate_to(shell, &mut cmd, "offprint", &completions_dir).unwrap();
    }

    println!(
        "cargo:warning=Shell completions generated in: {}",
        completions_dir.display()
    );
}
