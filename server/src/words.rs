use rand::seq::SliceRandom;
use rand::Rng;
use std::path::Path;
use std::{fs, io};

const BUILTIN: &[&str] = &[
    "apple", "banana", "bicycle", "butterfly", "camera", "castle", "cat", "cloud", "dragon",
    "elephant", "giraffe", "guitar", "hamburger", "helicopter", "house", "ice cream", "lighthouse",
    "moon", "mountain", "octopus", "penguin", "pizza", "rainbow", "robot", "rocket", "snowman",
    "spider", "sunflower", "telescope", "tree", "umbrella", "volcano", "whale",
];

#[derive(Debug, Clone)]
pub struct WordBook {
    words: Vec<String>,
}

impl WordBook {
    pub fn builtin() -> Self {
        Self {
            words: BUILTIN.iter().map(|w| (*w).to_owned()).collect(),
        }
    }

    /// Blank lines are skipped; a list without any word falls back to the built-in one.
    pub fn from_lines(text: &str) -> Self {
        let words: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect();
        if words.is_empty() {
            log::warn!("word list is empty, using the built-in list");
            return Self::builtin();
        }
        Self { words }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let book = Self::from_lines(&text);
        log::info!("loaded {} words from {}", book.len(), path.display());
        Ok(book)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        self.words
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| BUILTIN[0].to_owned())
    }

    /// Any word other than `previous`, unless the book has only one.
    pub fn pick_other<R: Rng + ?Sized>(&self, rng: &mut R, previous: Option<&str>) -> String {
        let candidates: Vec<&String> = self
            .words
            .iter()
            .filter(|w| Some(w.as_str()) != previous)
            .collect();
        match candidates.choose(rng) {
            Some(word) => (*word).clone(),
            None => self.pick(rng),
        }
    }
}

/// Letters a guesser is told about: Unicode scalars, whitespace excluded.
pub fn word_len(word: Option<&str>) -> u32 {
    word.map(|w| w.chars().filter(|c| !c.is_whitespace()).count() as u32)
        .unwrap_or(0)
}

pub fn mask(word: &str) -> String {
    "☆".repeat(word_len(Some(word)).max(1) as usize)
}
