use std::path::Path;
use std::{fs, io};
use std::io::{BufRead, BufReader};

/// Non-empty lines of a text file, trimmed.
pub(crate) fn file_to_vec<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
    let file_in = fs::File::open(filename)?;
    let file_reader = BufReader::new(file_in);
    let mut lines = Vec::new();
    for line in file_reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

pub(crate) fn human_bytes(size: f64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_picks_the_largest_unit() {
        assert_eq!(human_bytes(512.0), "512.0 B");
        assert_eq!(human_bytes(1536.0), "1.5 KB");
        assert_eq!(human_bytes(12.0 * 1024.0 * 1024.0), "12.0 MB");
    }

    #[test]
    fn labels_file_skips_blank_lines() {
        let path = std::env::temp_dir().join(format!("live_detect_labels_{}.txt", std::process::id()));
        fs::write(&path, "sugar_beet\n\n  weed \n").unwrap();
        assert_eq!(file_to_vec(&path).unwrap(), vec!["sugar_beet", "weed"]);
        fs::remove_file(&path).unwrap();
    }
}
