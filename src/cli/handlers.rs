// FILE: src/cli/handlers.rs
use crate::{
    cli::OutputFormat,
    compile_file_with_options, compile_source_with_options, CompilationStats, CompilerError, CompilerOptions, Result,
};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

fn required_arg<'m>(matches: &'m clap::ArgMatches, name: &str) -> Result<&'m String> {
    matches.get_one::<String>(name).ok_or_else(|| CompilerError::InvalidFormat {
        message: format!("Missing required argument <{}>", name),
    })
}

// --- COMPILE ---
pub fn handle_compile_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required_arg(matches, "input")?;
    let output_path = output_path_for(
        input_path,
        matches.get_one::<String>("output").map(String::as_str),
        cli.config().output_directory.as_deref(),
    );
    let output_path = output_path.to_string_lossy().into_owned();

    if let Some(parent) = Path::new(&output_path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let options = cli.build_compiler_options(matches)?;
    compile_single_file(input_path, &output_path, options, matches)
}

/// `-o` if given, else the input's name with a `.css` extension, placed in
/// the configured output directory or next to the input
fn output_path_for(input_path: &str, output: Option<&str>, output_directory: Option<&str>) -> PathBuf {
    if let Some(output) = output {
        return PathBuf::from(output);
    }
    let css_path = Path::new(input_path).with_extension("css");
    match (output_directory, css_path.file_name()) {
        (Some(directory), Some(file_name)) => Path::new(directory).join(file_name),
        _ => css_path,
    }
}

fn compile_single_file(
    input_path: &str,
    output_path: &str,
    options: CompilerOptions,
    matches: &clap::ArgMatches,
) -> Result<()> {
    let format = matches.get_one::<OutputFormat>("format").copied().unwrap_or(OutputFormat::Css);
    let quiet = matches!(format, OutputFormat::Json);
    if !quiet {
        println!("🔨 Compiling {} -> {}", input_path, output_path);
    }

    let compile_start = Instant::now();
    let stats = compile_file_with_options(input_path, output_path, options)?;
    let compile_time = compile_start.elapsed();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&stats).map_err(|e| CompilerError::InvalidFormat {
                message: format!("JSON serialization error: {}", e),
            })?;
            println!("{}", json);
        }
        OutputFormat::Css => {
            println!("✅ Compilation successful!");
            println!("   Output: {} bytes", stats.output_size);
            println!("   Time: {}ms", compile_time.as_millis());
            if stats.warning_count > 0 {
                println!("   Warnings: {}", stats.warning_count);
            }
            if matches.get_flag("stats") {
                print_detailed_stats(&stats);
            }
        }
    }

    Ok(())
}

// --- CHECK ---
pub fn handle_check_command(cli: &super::EnhancedCli, matches: &clap::ArgMatches) -> Result<()> {
    let input_path = required_arg(matches, "input")?;
    let recursive = matches.get_flag("recursive");
    let options = cli.build_compiler_options(matches)?;

    if recursive && Path::new(input_path).is_dir() {
        let summary = check_directory(Path::new(input_path), &options)?;
        println!("\n📊 Check Summary:");
        println!("   Total files: {}", summary.total_files);
        println!("   Files with errors: {}", summary.error_files);
        if summary.total_files > 0 {
            println!(
                "   Success rate: {:.1}%",
                (summary.total_files - summary.error_files) as f64 / summary.total_files as f64 * 100.0
            );
        }
        if summary.error_files > 0 {
            return Err(CompilerError::InvalidFormat {
                message: format!("{} file(s) have errors", summary.error_files),
            });
        }
        Ok(())
    } else {
        check_single_file(Path::new(input_path), &options).map(|_| ())
    }
}

#[derive(Debug, Default, PartialEq)]
struct CheckSummary {
    total_files: usize,
    error_files: usize,
}

fn check_single_file(input_path: &Path, options: &CompilerOptions) -> Result<CompilationStats> {
    println!("🔍 Checking {}", input_path.display());
    let source = fs::read_to_string(input_path).map_err(|e| CompilerError::FileNotFound {
        path: format!("{}: {}", input_path.display(), e),
    })?;
    let filename = input_path.to_string_lossy();

    match compile_source_with_options(&source, &filename, options.clone()) {
        Ok((_, stats)) => {
            println!("✅ {} - No issues found", input_path.display());
            Ok(stats)
        }
        Err(e) => {
            println!("❌ {} - {}", input_path.display(), e);
            Err(e)
        }
    }
}

/// Check every non-partial `.scss` file below `dir`. Partials (`_name.scss`)
/// are only meaningful when imported and are skipped.
fn check_directory(dir: &Path, options: &CompilerOptions) -> Result<CheckSummary> {
    let mut summary = CheckSummary::default();

    for entry in walkdir::WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            CompilerError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Directory traversal error: {}", e),
            ))
        })?;
        let path = entry.path();
        let is_scss = path.extension().map_or(false, |ext| ext == "scss");
        if !entry.file_type().is_file() || !is_scss {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with('_') {
            log::debug!("Skipping partial {}", path.display());
            continue;
        }
        summary.total_files += 1;
        if check_single_file(path, options).is_err() {
            summary.error_files += 1;
        }
    }
    Ok(summary)
}

fn print_detailed_stats(stats: &CompilationStats) {
    println!("\n📈 Detailed Statistics:");
    println!("   Source size: {} bytes", stats.source_size);
    println!("   Output size: {} bytes", stats.output_size);
    println!("   Rules: {}", stats.rule_count);
    println!("   Media blocks: {}", stats.media_count);
    println!("   Imports: {}", stats.import_count);
    println!("   Extensions: {}", stats.extension_count);
    println!("   Warnings: {}", stats.warning_count);
    println!("   Compile time: {}ms", stats.compile_time_ms);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_output_path() {
        assert_eq!(output_path_for("src/main.scss", None, None), PathBuf::from("src/main.css"));
        assert_eq!(output_path_for("src/main.scss", Some("out.css"), Some("dist")), PathBuf::from("out.css"));
        assert_eq!(output_path_for("src/main.scss", None, Some("dist")), PathBuf::from("dist/main.css"));
    }

    #[test]
    fn test_check_directory_counts_errors() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("good.scss"), "@import \"vars\";\n.a { color: $accent; }").unwrap();
        fs::write(dir.path().join("_vars.scss"), "$accent: red;").unwrap();
        fs::write(dir.path().join("bad.scss"), ".a { color: $undefined; }").unwrap();
        fs::write(dir.path().join("nested/more.scss"), ".b { .c { d: e; } }").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a stylesheet {").unwrap();

        let summary = check_directory(dir.path(), &CompilerOptions::default()).unwrap();
        assert_eq!(
            summary,
            CheckSummary {
                total_files: 3,
                error_files: 1
            }
        );
    }

    #[test]
    fn test_check_single_file_reports_stats() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.scss");
        fs::write(&path, ".a { @media print { b: c; } }").unwrap();

        let stats = check_single_file(&path, &CompilerOptions::default()).unwrap();
        assert_eq!(stats.media_count, 1);
        assert!(!dir.path().join("main.css").exists());

        let missing = dir.path().join("missing.scss");
        assert!(matches!(
            check_single_file(&missing, &CompilerOptions::default()),
            Err(CompilerError::FileNotFound { .. })
        ));
    }
}
