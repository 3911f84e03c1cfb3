//! All-time win counts

use crate::error::ScoreError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Where winners are recorded. Implementations must accept both new and
/// already-known names.
pub trait ScoreStore: Send {
    /// Adds one win for `name` and returns its new total
    fn record_win(&mut self, name: &str) -> Result<u32, ScoreError>;

    /// Best `n` players, most wins first
    fn top_n(&self, n: usize) -> Result<Vec<(String, u32)>, ScoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub name: String,
    pub wins: u32,
}

fn rank<'a>(records: impl Iterator<Item = (&'a str, u32)>, n: usize) -> Vec<(String, u32)> {
    let mut ranked: Vec<(String, u32)> = records
        .map(|(name, wins)| (name.to_string(), wins))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    ranked
}

#[derive(Debug, Default, Clone)]
pub struct MemoryScores {
    wins: HashMap<String, u32>,
}

impl ScoreStore for MemoryScores {
    fn record_win(&mut self, name: &str) -> Result<u32, ScoreError> {
        let wins = self.wins.entry(name.to_string()).or_insert(0);
        *wins += 1;
        Ok(*wins)
    }

    fn top_n(&self, n: usize) -> Result<Vec<(String, u32)>, ScoreError> {
        Ok(rank(
            self.wins.iter().map(|(name, wins)| (name.as_str(), *wins)),
            n,
        ))
    }
}

/// Win counts kept in a JSON file, rewritten after every recorded win
#[derive(Debug)]
pub struct Leaderboard {
    path: PathBuf,
    records: Vec<ScoreRecord>,
}

impl Leaderboard {
    /// Loads the file at `path`; a missing file starts an empty board
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ScoreError> {
        let path = path.as_ref().to_path_buf();
        let records: Vec<ScoreRecord> = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Vec::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        debug!("Loaded {} leaderboard records from {}", records.len(), path.display());
        Ok(Self { path, records })
    }

    fn save(&self) -> Result<(), ScoreError> {
        let contents = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl ScoreStore for Leaderboard {
    fn record_win(&mut self, name: &str) -> Result<u32, ScoreError> {
        let wins = match self.records.iter_mut().find(|r| r.name == name) {
            Some(record) => {
                record.wins += 1;
                record.wins
            }
            None => {
                self.records.push(ScoreRecord {
                    name: name.to_string(),
                    wins: 1,
                });
                1
            }
        };

        self.save()?;
        Ok(wins)
    }

    fn top_n(&self, n: usize) -> Result<Vec<(String, u32)>, ScoreError> {
        Ok(rank(
            self.records.iter().map(|r| (r.name.as_str(), r.wins)),
            n,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_scores_new_and_known_names() {
        let mut scores = MemoryScores::default();

        assert_eq!(scores.record_win("ruby").unwrap(), 1);
        assert_eq!(scores.record_win("ruby").unwrap(), 2);
        assert_eq!(scores.record_win("BOT_cook").unwrap(), 1);
    }

    #[test]
    fn test_top_n_ordering() {
        let mut scores = MemoryScores::default();
        for name in ["b", "a", "c", "c", "c", "a"] {
            scores.record_win(name).unwrap();
        }

        let top = scores.top_n(2).unwrap();

        assert_eq!(top, vec![("c".to_string(), 3), ("a".to_string(), 2)]);
    }

    #[test]
    fn test_leaderboard_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("winners.json");

        {
            let mut board = Leaderboard::open(&path).unwrap();
            board.record_win("ruby").unwrap();
            board.record_win("ruby").unwrap();
            board.record_win("BOT_drake").unwrap();
        }

        let mut board = Leaderboard::open(&path).unwrap();
        assert_eq!(board.record_win("ruby").unwrap(), 3);
        assert_eq!(
            board.top_n(3).unwrap(),
            vec![("ruby".to_string(), 3), ("BOT_drake".to_string(), 1)]
        );
    }

    #[test]
    fn test_leaderboard_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let board = Leaderboard::open(dir.path().join("absent.json")).unwrap();

        assert!(board.top_n(3).unwrap().is_empty());
    }

    #[test]
    fn test_leaderboard_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("winners.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(Leaderboard::open(&path), Err(ScoreError::Format(_))));
    }
}
