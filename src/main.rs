//! SCSS Compiler Binary

use scssc::{CompilerError, EnhancedCli};
use std::process;

fn main() {
    let mut cli = EnhancedCli::new();

    match cli.run() {
        Ok(()) => {}
        Err(CompilerError::Io(e)) => {
            eprintln!("IO Error: {}", e);
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Compilation failed: {}", e);
            process::exit(1);
        }
    }
}
