//! LPDAAC order-fulfillment email scraping.

use crate::utils::error::{IngestError, Result};
use std::path::{Path, PathBuf};

const ORDER_ID_MARKER: &str = "ORDERID";
const DOWNLOAD_LINKS_MARKER: &str = "Download Links";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LpdaacOrder {
    pub order_id: String,
    pub download_url: String,
    pub source: PathBuf,
}

/// Finds the order id and the download link in an email body.
///
/// The order id is every digit on the `ORDERID` line; the link is the line
/// right after `Download Links`. Both must be seen before a result is returned.
pub fn scrape_order(text: &str) -> Option<(String, String)> {
    let mut parsed_lines: Vec<&str> = Vec::new();
    let mut order_id: Option<String> = None;
    let mut link_index: Option<usize> = None;

    for (i, line) in text.lines().enumerate() {
        parsed_lines.push(line.trim());
        if let (Some(id), Some(idx)) = (&order_id, link_index) {
            return Some((id.clone(), parsed_lines[idx].to_string()));
        }
        if line.contains(ORDER_ID_MARKER) {
            let digits: String = line.chars().filter(char::is_ascii_digit).collect();
            order_id = Some(digits).filter(|d| !d.is_empty());
        }
        if line.contains(DOWNLOAD_LINKS_MARKER) {
            link_index = Some(i + 1);
        }
    }
    None
}

/// Reads an email leniently; undecodable bytes are dropped.
pub fn scrape_email_file(path: &Path) -> Result<Option<LpdaacOrder>> {
    let bytes = std::fs::read(path)?;
    let text: String = String::from_utf8_lossy(&bytes)
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .collect();

    Ok(scrape_order(&text).map(|(order_id, download_url)| LpdaacOrder {
        order_id,
        download_url,
        source: path.to_path_buf(),
    }))
}

/// Every entry of the email directory, sorted. Subdirectories are an error.
pub fn list_email_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut emails = Vec::new();
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if !path.is_file() {
            return Err(IngestError::processing(format!(
                "Failed to find docs file {}",
                path.display()
            )));
        }
        emails.push(path);
    }
    emails.sort();
    Ok(emails)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const EMAIL: &str = "\
Dear LP DAAC User,

Your order is ready.
ORDERID: 0600123456
Order Status: CLOSED

Download Links:
  https://e4ftl01.cr.usgs.gov/PullDir/0600123456/
Files will remain available for 7 days.
";

    #[test]
    fn test_scrape_order() {
        let (order_id, url) = scrape_order(EMAIL).unwrap();
        assert_eq!(order_id, "0600123456");
        assert_eq!(url, "https://e4ftl01.cr.usgs.gov/PullDir/0600123456/");
    }

    #[test]
    fn test_link_line_must_exist() {
        let text = "ORDERID: 42\nDownload Links:\nhttps://e4ftl01.example/PullDir/42/";
        assert_eq!(
            scrape_order(text).unwrap().1,
            "https://e4ftl01.example/PullDir/42/"
        );
        // 標記在最後一行，沒有連結可讀
        assert!(scrape_order("ORDERID: 42\nDownload Links:").is_none());
    }

    #[test]
    fn test_missing_markers() {
        assert!(scrape_order("Download Links:\nhttps://x/\n\n").is_none());
        assert!(scrape_order("ORDERID: 7\nno links here\n\n").is_none());
        assert!(scrape_order("ORDERID: none\nDownload Links:\nhttps://x/\n\n").is_none());
    }

    #[test]
    fn test_scrape_email_file_ignores_bad_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("order.eml");
        let mut bytes = vec![0xff, 0xfe];
        bytes.extend_from_slice(EMAIL.as_bytes());
        std::fs::write(&path, bytes).unwrap();

        let order = scrape_email_file(&path).unwrap().unwrap();
        assert_eq!(order.order_id, "0600123456");
        assert_eq!(order.source, path);
    }

    #[test]
    fn test_list_email_files_rejects_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.eml"), "x").unwrap();
        std::fs::write(dir.path().join("a.eml"), "x").unwrap();
        let files = list_email_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.eml"));

        std::fs::create_dir(dir.path().join("nested")).unwrap();
        assert!(list_email_files(dir.path()).is_err());
    }
}
