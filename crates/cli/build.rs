use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=OUT_DIR");

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let completions_dir = out_dir.join("completions");

    fs::create_dir_all(&completions_dir).unwrap();

    let mut cmd = clap::Command::new("quill")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Quill Contributors")
        .about("Turn trending engineering headlines into an illustrated Hashnode post")
        .arg(
            clap::arg!(--feed <URL> "Feed URL to scan; repeat to scan several")
                .action(clap::ArgAction::Append),
        )
        .arg(
            clap::arg!(--"feeds-file" <FILE> "File listing feed URLs, one per line")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--tag <NAME> "Tag to attach to the post").action(clap::ArgAction::Append))
        .arg(clap::arg!(--"generation-key" <KEY> "API key for the generation service"))
        .arg(clap::arg!(--"hashnode-key" <KEY> "Hashnode personal access token"))
        .arg(clap::arg!(--model <MODEL> "Model used for every generation call"))
        .arg(clap::arg!(--"generation-url" <URL> "Base URL of an OpenAI-compatible chat completions API"))
        .arg(clap::arg!(--language <LANG> "Language the article is written in").default_value("English"))
        .arg(clap::arg!(--placeholders <N> "Number of image placeholders requested").default_value("2"))
        .arg(clap::arg!(--"no-normalize" "Skip the cleanup pass over the draft"))
        .arg(clap::arg!(--"no-art-direction" "Use the plain cover prompt"))
        .arg(clap::arg!(--"no-cover-review" "Skip the review of the synthesized cover"))
        .arg(clap::arg!(--timeout <SECS> "Feed and page fetch timeout in seconds").default_value("10"))
        .arg(clap::arg!(--"dry-run" "Run every stage except publishing"))
        .arg(
            clap::arg!(-o --output <FILE> "Write the dry-run document to a file")
                .value_parser(clap::value_parser!(std::path::PathBuf)),
        )
        .arg(clap::arg!(--check "Only check the generation service credentials"))
        .arg(clap::arg!(-v --verbose "Enable debug logging"));

    clap_complete::generate_to(clap_complete::shells::Bash, &mut cmd, "quill", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Zsh, &mut cmd, "quill", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::Fish, &mut cmd, "quill", &completions_dir).unwrap();
    clap_complete::generate_to(clap_complete::shells::PowerShell, &mut cmd, "quill", &completions_dir).unwrap();

    println!("cargo:warning=Shell completions generated in: {}", completions_dir.display());
}
