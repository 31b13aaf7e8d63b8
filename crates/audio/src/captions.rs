//! Caption timing estimates.
//!
//! There are no word timestamps for generated narration, so the active
//! sentence is estimated from playback progress: each sentence is assumed
//! to take time proportional to its word count.

/// Split a script into sentences at `.`, `!` or `?` followed by whitespace.
/// The punctuation stays with its sentence; empty pieces are dropped.
pub fn split_sentences(script: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = script.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let terminal = matches!(c, '.' | '!' | '?');
        if terminal && chars.peek().is_some_and(|(_, next)| next.is_whitespace()) {
            push_trimmed(&mut sentences, &script[start..=i]);
            start = i + 1;
        }
    }
    push_trimmed(&mut sentences, &script[start..]);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Index of the sentence being spoken at `progress` (0..=1).
///
/// The first sentence whose cumulative word share exceeds `progress` wins.
/// `None` only when there are no sentences.
pub fn active_sentence_index<S: AsRef<str>>(sentences: &[S], progress: f32) -> Option<usize> {
    let counts: Vec<usize> = sentences.iter().map(|s| count_words(s.as_ref())).collect();
    active_index_from_counts(&counts, progress)
}

fn active_index_from_counts(counts: &[usize], progress: f32) -> Option<usize> {
    let last = counts.len().checked_sub(1)?;
    if last == 0 || progress <= 0.0 || progress.is_nan() {
        return Some(0);
    }
    if progress >= 1.0 {
        return Some(last);
    }
    let total: usize = counts.iter().sum();
    if total == 0 {
        return Some(0);
    }
    let mut cumulative = 0usize;
    for (i, words) in counts.iter().enumerate() {
        cumulative += words;
        if cumulative as f32 / total as f32 > progress {
            return Some(i);
        }
    }
    Some(last)
}

/// Display state of a caption sentence relative to the active one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SentencePhase {
    Past,
    Active,
    Upcoming,
}

/// Sentences of one slide's script with precomputed word counts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptionTrack {
    sentences: Vec<String>,
    word_counts: Vec<usize>,
}

impl CaptionTrack {
    pub fn new(script: &str) -> Self {
        let sentences = split_sentences(script);
        let word_counts = sentences.iter().map(|s| count_words(s)).collect();
        Self {
            sentences,
            word_counts,
        }
    }

    pub fn sentences(&self) -> &[String] {
        &self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn active_index(&self, progress: f32) -> Option<usize> {
        active_index_from_counts(&self.word_counts, progress)
    }

    pub fn active_sentence(&self, progress: f32) -> Option<&str> {
        self.active_index(progress)
            .and_then(|i| self.sentences.get(i))
            .map(String::as_str)
    }

    pub fn phase(&self, index: usize, progress: f32) -> Option<SentencePhase> {
        if index >= self.sentences.len() {
            return None;
        }
        let active = self.active_index(progress)?;
        Some(match index.cmp(&active) {
            std::cmp::Ordering::Less => SentencePhase::Past,
            std::cmp::Ordering::Equal => SentencePhase::Active,
            std::cmp::Ordering::Greater => SentencePhase::Upcoming,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_punctuation() {
        assert_eq!(
            split_sentences("Hello there. How are you? Great!"),
            vec!["Hello there.", "How are you?", "Great!"]
        );
    }

    #[test]
    fn split_requires_whitespace_after_punctuation() {
        assert_eq!(split_sentences("Version 1.5 is out. Yes."), vec![
            "Version 1.5 is out.",
            "Yes."
        ]);
        assert_eq!(split_sentences("e.g.this"), vec!["e.g.this"]);
    }

    #[test]
    fn split_handles_blank_scripts() {
        assert!(split_sentences("").is_empty());
        assert!(split_sentences("   \n ").is_empty());
        assert_eq!(split_sentences("No terminal punctuation"), vec![
            "No terminal punctuation"
        ]);
    }

    #[test]
    fn word_counts() {
        assert_eq!(count_words("one  two\tthree"), 3);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn two_sentence_progress() {
        let s = split_sentences("A. B.");
        assert_eq!(active_sentence_index(&s, 0.4), Some(0));
        assert_eq!(active_sentence_index(&s, 0.6), Some(1));
        assert_eq!(active_sentence_index(&s, 1.0), Some(1));
    }

    #[test]
    fn boundaries() {
        let s = split_sentences("One two three. Four. Five six.");
        assert_eq!(active_sentence_index(&s, -1.0), Some(0));
        assert_eq!(active_sentence_index(&s, 0.0), Some(0));
        assert_eq!(active_sentence_index(&s, 2.0), Some(2));
        let empty: [&str; 0] = [];
        assert_eq!(active_sentence_index(&empty, 0.5), None);
        assert_eq!(active_sentence_index(&["Only one."], 0.9), Some(0));
    }

    #[test]
    fn weighted_by_words() {
        // 3 + 1 + 2 words: boundaries at 0.5 and 0.667.
        let s = split_sentences("One two three. Four. Five six.");
        assert_eq!(active_sentence_index(&s, 0.49), Some(0));
        assert_eq!(active_sentence_index(&s, 0.55), Some(1));
        assert_eq!(active_sentence_index(&s, 0.7), Some(2));
    }

    #[test]
    fn monotonic_in_progress() {
        let s = split_sentences("a b. c d e. f. g h i j. k.");
        let mut previous = 0;
        for step in 0..=100 {
            let index = active_sentence_index(&s, step as f32 / 100.0).unwrap();
            assert!(index >= previous);
            previous = index;
        }
        assert_eq!(previous, s.len() - 1);
    }

    #[test]
    fn track_phases() {
        let track = CaptionTrack::new("First one. Second one. Third one.");
        assert_eq!(track.len(), 3);
        assert_eq!(track.active_sentence(0.5), Some("Second one."));
        assert_eq!(track.phase(0, 0.5), Some(SentencePhase::Past));
        assert_eq!(track.phase(1, 0.5), Some(SentencePhase::Active));
        assert_eq!(track.phase(2, 0.5), Some(SentencePhase::Upcoming));
        assert_eq!(track.phase(3, 0.5), None);
    }

    #[test]
    fn empty_track_has_no_active_sentence() {
        let track = CaptionTrack::new("");
        assert!(track.is_empty());
        assert_eq!(track.active_index(0.3), None);
        assert_eq!(track.phase(0, 0.3), None);
    }
}
