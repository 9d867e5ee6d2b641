use std::io::Read;
use std::path::Path;

pub(crate) fn is_stdin_flag(path: &Path) -> bool {
    path == Path::new("-")
}

pub(crate) fn read_stdin() -> Result<String, String> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer).map_err(|e| e.to_string())?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_dash_as_stdin_flag() {
        assert!(is_stdin_flag(Path::new("-")));
        assert!(!is_stdin_flag(Path::new("script.sql")));
    }
}
