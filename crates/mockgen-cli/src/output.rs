use crate::errors::CliError;
use colored::Colorize;

/// reports an error to stderr
pub fn error(error: &CliError) {
    eprintln!("{}", format!("Error: {error}").bright_red());
}

/// reports to stderr where the declarations were written
pub fn written(path: &std::path::Path, operations: usize) {
    eprintln!(
        "{} {} ({operations} operations)",
        "Wrote".green(),
        path.display().to_string().bold()
    );
}
