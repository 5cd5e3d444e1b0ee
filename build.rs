use std::path::Path;
use std::process::Command;

const INPUT: &str = "assets/css/input.css";
const OUTPUT: &str = "assets/css/output.css";

fn main() {
    println!("cargo:rerun-if-changed={INPUT}");
    println!("cargo:rerun-if-changed=templates/");

    let status = Command::new("tailwindcss")
        .args(["-i", INPUT, "-o", OUTPUT, "--minify"])
        .status();

    match status {
        Ok(s) if s.success() => {
            println!("cargo:warning=Stylesheet compiled with tailwindcss");
        }
        _ => {
            // No tailwind binary: ship the hand-written sheet as is.
            println!("cargo:warning=tailwindcss not found, copying {INPUT}");
            let sheet = std::fs::read_to_string(INPUT).unwrap_or_default();
            std::fs::create_dir_all(Path::new(OUTPUT).parent().unwrap_or(Path::new("."))).ok();
            std::fs::write(OUTPUT, strip_directives(&sheet)).ok();
        }
    }
}

/// Drops `@tailwind` lines, which only mean something to the tailwind CLI.
fn strip_directives(sheet: &str) -> String {
    sheet
        .lines()
        .filter(|line| !line.trim_start().starts_with("@tailwind"))
        .collect::<Vec<_>>()
        .join("\n")
}
