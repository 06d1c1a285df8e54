use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use super::{Announcement, AnnouncementMatch, AnnouncementStore, BackendError};

const ANNOUNCEMENT_EXTENSION: &str = "txt";

/// Announcements stored as `.txt` files in a single directory.
pub struct FsAnnouncementStore {
    dir: PathBuf,
}

impl FsAnnouncementStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Only bare file names are accepted; anything that could leave the
    /// announcements directory is rejected before touching the disk.
    fn resolve(&self, filename: &str) -> Result<PathBuf, BackendError> {
        let filename = filename.trim();
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return Err(BackendError::InvalidInput(format!(
                "'{filename}' is not a valid announcement file name"
            )));
        }
        Ok(self.dir.join(filename))
    }

    async fn read_dir_sorted(&self) -> Result<Vec<String>, BackendError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BackendError::NotFound(format!(
                    "Announcements directory {}",
                    self.dir.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ANNOUNCEMENT_EXTENSION) {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl AnnouncementStore for FsAnnouncementStore {
    async fn list_announcements(&self) -> Result<Vec<String>, BackendError> {
        self.read_dir_sorted().await
    }

    async fn read_announcement(&self, filename: &str) -> Result<Announcement, BackendError> {
        let path = self.resolve(filename)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Announcement {
                filename: filename.trim().to_string(),
                content,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BackendError::NotFound(format!(
                "Announcement '{}'",
                filename.trim()
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn search_announcements(
        &self,
        keyword: &str,
    ) -> Result<Vec<AnnouncementMatch>, BackendError> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return Err(BackendError::InvalidInput("keyword must not be empty".into()));
        }

        let mut matches = Vec::new();
        for filename in self.read_dir_sorted().await? {
            let content = tokio::fs::read_to_string(self.dir.join(&filename)).await?;
            let matching_lines: Vec<String> = content
                .lines()
                .filter(|line| line.to_lowercase().contains(&needle))
                .map(|line| line.trim().to_string())
                .collect();
            if !matching_lines.is_empty() || filename.to_lowercase().contains(&needle) {
                matches.push(AnnouncementMatch {
                    filename,
                    matching_lines,
                });
            }
        }
        Ok(matches)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("holiday_2024.txt"),
            "Holiday Calendar 2024\nDiwali: November 1\nChristmas: December 25\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("team_outing.txt"),
            "Team outing on March 8 at Lakeside Resort.\nRSVP to HR by March 1.\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.md"), "not an announcement").unwrap();
        dir
    }

    #[tokio::test]
    async fn lists_only_text_files_sorted() {
        let dir = fixture();
        let store = FsAnnouncementStore::new(dir.path());
        assert_eq!(
            store.list_announcements().await.unwrap(),
            vec!["holiday_2024.txt".to_string(), "team_outing.txt".to_string()]
        );
    }

    #[tokio::test]
    async fn reads_announcement_by_name() {
        let dir = fixture();
        let store = FsAnnouncementStore::new(dir.path());
        let announcement = store.read_announcement("team_outing.txt").await.unwrap();
        assert!(announcement.content.contains("Lakeside Resort"));
    }

    #[tokio::test]
    async fn rejects_path_traversal() {
        let dir = fixture();
        let store = FsAnnouncementStore::new(dir.path().join("inner"));
        let err = store.read_announcement("../holiday_2024.txt").await.unwrap_err();
        assert!(matches!(err, BackendError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = fixture();
        let store = FsAnnouncementStore::new(dir.path());
        let err = store.read_announcement("payroll.txt").await.unwrap_err();
        assert_eq!(err.to_string(), "Announcement 'payroll.txt' not found");
    }

    #[tokio::test]
    async fn search_matches_lines_case_insensitively() {
        let dir = fixture();
        let store = FsAnnouncementStore::new(dir.path());

        let found = store.search_announcements("MARCH").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].filename, "team_outing.txt");
        assert_eq!(found[0].matching_lines.len(), 2);

        let found = store.search_announcements("holiday").await.unwrap();
        assert_eq!(found[0].filename, "holiday_2024.txt");
        assert!(store.search_announcements("bonus").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_directory_is_reported() {
        let store = FsAnnouncementStore::new("/nonexistent/announcements");
        assert!(matches!(
            store.list_announcements().await,
            Err(BackendError::NotFound(_))
        ));
    }
}
