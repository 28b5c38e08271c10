//! Import format detection (spec.md §4.7): filename extension plus a small
//! amount of content sniffing decide which parser runs.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    Csv,
    Json,
    Hl7Cda,
    HtmlCda,
}

/// Sniff the import format from a filename and a content prefix.
pub fn detect_format(filename: &str, content: &[u8]) -> DetectedFormat {
    let lower = filename.to_lowercase();
    let prefix_len = content.len().min(4096);
    let prefix = String::from_utf8_lossy(&content[..prefix_len]);
    let trimmed = prefix.trim_start();

    if lower.ends_with(".csv") {
        return DetectedFormat::Csv;
    }
    if trimmed.to_lowercase().starts_with("<html") || trimmed.to_lowercase().starts_with("<!doctype html") {
        return DetectedFormat::HtmlCda;
    }
    if trimmed.starts_with('{') {
        if prefix.contains("\"resourceType\"") && prefix.contains("\"Bundle\"") {
            return DetectedFormat::Hl7Cda;
        }
        return DetectedFormat::Json;
    }
    if lower.ends_with(".json") {
        return DetectedFormat::Json;
    }
    // No recognised extension or JSON/HTML content shape; fall back to CSV,
    // the most permissive parser.
    DetectedFormat::Csv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_extension_wins_regardless_of_content() {
        assert_eq!(detect_format("export.csv", b"patient_cd,x\n"), DetectedFormat::Csv);
    }

    #[test]
    fn bundle_json_is_hl7_cda() {
        let content = br#"{"resourceType":"Bundle","entry":[]}"#;
        assert_eq!(detect_format("bundle.json", content), DetectedFormat::Hl7Cda);
    }

    #[test]
    fn plain_json_object_is_json() {
        let content = br#"{"metadata": {}}"#;
        assert_eq!(detect_format("export.dat", content), DetectedFormat::Json);
    }

    #[test]
    fn html_document_is_html_cda() {
        assert_eq!(detect_format("page.html", b"<html><body></body></html>"), DetectedFormat::HtmlCda);
    }
}
