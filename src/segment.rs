use crate::model::{ChunkKind, Comment, TextChunk};
use crate::utils::sanitize_text;
use std::ops::Range;
use tracing::{debug, info, warn};

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}')
}

/// Length a chunk is budgeted by: characters of the normalized text, not
/// counting the punctuation run that closes the last sentence.
pub fn measured_len(text: &str) -> usize {
    let total = text.chars().count();
    let tail = text
        .chars()
        .rev()
        .take_while(|c| is_terminal(*c) || is_closer(*c))
        .count();
    total - tail
}

fn normalized(text: &str, span: &Range<usize>) -> String {
    text[span.clone()].split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_trimmed(spans: &mut Vec<Range<usize>>, text: &str, start: usize, end: usize) {
    let trimmed = text[start..end].trim_end();
    if !trimmed.is_empty() {
        spans.push(start..start + trimmed.len());
    }
}

/// Byte spans of sentences. Every non-whitespace character belongs to exactly one span.
fn sentence_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '\n' {
            if let Some(s) = start.take() {
                push_trimmed(&mut spans, text, s, i);
            }
            continue;
        }
        if start.is_none() {
            if c.is_whitespace() {
                continue;
            }
            start = Some(i);
        }
        if !is_terminal(c) {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(&(j, d)) = chars.peek() {
            if is_terminal(d) || is_closer(d) {
                end = j + d.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let at_boundary = match chars.peek() {
            None => true,
            Some(&(_, d)) => d.is_whitespace(),
        };
        if at_boundary {
            if let Some(s) = start.take() {
                push_trimmed(&mut spans, text, s, end);
            }
        }
    }
    if let Some(s) = start {
        push_trimmed(&mut spans, text, s, text.len());
    }
    spans
}

fn word_spans(text: &str, within: &Range<usize>) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text[within.clone()].char_indices() {
        let at = within.start + i;
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push(s..at);
                start = None;
            }
            (false, None) => start = Some(at),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push(s..within.end);
    }
    spans
}

/// Greedily merges consecutive spans while the merged text stays within `max_len`.
fn pack(text: &str, pieces: Vec<Range<usize>>, max_len: usize) -> Vec<Range<usize>> {
    let mut packed = Vec::new();
    let mut current: Option<Range<usize>> = None;
    for piece in pieces {
        current = match current {
            None => Some(piece),
            Some(cur) => {
                let merged = cur.start..piece.end;
                if measured_len(&normalized(text, &merged)) <= max_len {
                    Some(merged)
                } else {
                    packed.push(cur);
                    Some(piece)
                }
            }
        };
    }
    if let Some(cur) = current {
        packed.push(cur);
    }
    packed
}

/// Splits a block of text into display-sized chunks, preferring sentence
/// boundaries and falling back to word boundaries. A single word longer than
/// `max_len` becomes a chunk of its own rather than being cut.
///
/// Only whole sentences are packed together. The word pieces of an over-long
/// sentence stay on their own and never absorb a neighbouring sentence.
pub fn segment_text(text: &str, max_len: usize) -> Vec<TextChunk> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut spans = Vec::new();
    let mut sentences = Vec::new();
    for sentence in sentence_spans(text) {
        if measured_len(&normalized(text, &sentence)) <= max_len {
            sentences.push(sentence);
            continue;
        }
        spans.extend(pack(text, std::mem::take(&mut sentences), max_len));
        debug!("Sentence exceeds {} chars; splitting at word boundaries", max_len);
        for words in pack(text, word_spans(text, &sentence), max_len) {
            if measured_len(&normalized(text, &words)) > max_len {
                warn!(
                    "Word longer than {} chars kept as its own chunk: {:.40}",
                    max_len,
                    &text[words.clone()]
                );
            }
            spans.push(words);
        }
    }
    spans.extend(pack(text, sentences, max_len));

    spans
        .into_iter()
        .enumerate()
        .map(|(index, span)| TextChunk::new(index, ChunkKind::Body, normalized(text, &span), span))
        .collect()
}

pub fn segment_comments(comments: &[Comment]) -> Vec<TextChunk> {
    comments
        .iter()
        .filter(|c| !c.body.trim().is_empty())
        .enumerate()
        .map(|(index, c)| {
            let text = c.body.split_whitespace().collect::<Vec<_>>().join(" ");
            TextChunk::new(index, ChunkKind::Comment, text, 0..c.body.len())
        })
        .collect()
}

/// Storymode narrates the post body; otherwise each comment is one chunk.
pub fn segment(body: &str, comments: &[Comment], max_len: usize, storymode: bool) -> Vec<TextChunk> {
    let chunks = if storymode {
        info!("Splitting story into chunks with max {} chars", max_len);
        segment_text(body, max_len)
    } else {
        info!("Using {} comments as chunks", comments.len());
        segment_comments(comments)
    };
    info!("Created {} text chunks", chunks.len());
    chunks
}

/// Prepends the title, split like any other text, and drops chunks with
/// nothing a voice can read. Indices are renumbered to stay contiguous.
pub fn with_title(title: &str, max_len: usize, chunks: Vec<TextChunk>) -> Vec<TextChunk> {
    let head = segment_text(title, max_len).into_iter().map(|mut c| {
        c.kind = ChunkKind::Title;
        c
    });
    head.chain(chunks)
        .filter(|c| !sanitize_text(&c.text).is_empty())
        .enumerate()
        .map(|(index, mut c)| {
            c.index = index;
            c
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[TextChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn splits_at_sentence_boundaries() {
        let chunks = segment_text("Line one. Line two. Line three.", 10);
        assert_eq!(texts(&chunks), vec!["Line one.", "Line two.", "Line three."]);
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn packs_short_sentences_together() {
        let chunks = segment_text("Hi. Yes. No way! Really?", 20);
        assert_eq!(texts(&chunks), vec!["Hi. Yes. No way!", "Really?"]);
    }

    #[test]
    fn falls_back_to_word_boundaries() {
        let text = "this sentence has no terminal punctuation and keeps going";
        let chunks = segment_text(text, 16);
        for chunk in &chunks {
            assert!(measured_len(&chunk.text) <= 16, "{:?}", chunk.text);
        }
        assert_eq!(texts(&chunks).join(" "), text);
    }

    #[test]
    fn never_cuts_inside_a_word() {
        let chunks = segment_text("a supercalifragilistic word", 8);
        assert_eq!(texts(&chunks), vec!["a", "supercalifragilistic", "word"]);
    }

    #[test]
    fn empty_and_blank_input_yield_nothing() {
        assert!(segment_text("", 50).is_empty());
        assert!(segment_text("   \n\t ", 50).is_empty());
    }

    #[test]
    fn decimal_points_do_not_end_sentences() {
        let chunks = segment_text("Pi is 3.14 roughly. Done.", 19);
        assert_eq!(texts(&chunks), vec!["Pi is 3.14 roughly.", "Done."]);
    }

    #[test]
    fn newlines_end_sentences() {
        let chunks = segment_text("first line\nsecond line", 12);
        assert_eq!(texts(&chunks), vec!["first line", "second line"]);
    }

    #[test]
    fn chunks_reassemble_the_source() {
        let text = "So this happened yesterday.  My cat (who is 12!) jumped on the \
                    table and knocked over my coffee... Then he stared at me like it was my \
                    fault?! I still can't believe it.\n\nAnyway, AITA for being mad at a cat";
        for max in [5, 17, 40, 80, 500] {
            let chunks = segment_text(text, max);
            let joined = texts(&chunks).join(" ");
            assert_eq!(joined, text.split_whitespace().collect::<Vec<_>>().join(" "));
            for chunk in &chunks {
                let longest_word = chunk.text.split_whitespace().map(|w| w.len()).max().unwrap();
                assert!(measured_len(&chunk.text) <= max || longest_word > max);
            }
            assert_eq!(segment_text(text, max), chunks);
        }
    }

    #[test]
    fn spans_point_back_into_the_source() {
        let text = "One two. Three four.";
        let chunks = segment_text(text, 10);
        assert_eq!(&text[chunks[1].span.clone()], "Three four.");
    }

    #[test]
    fn comments_become_one_chunk_each() {
        let comments = vec![
            Comment {
                id: "a".into(),
                body: "First   comment".into(),
                score: 10,
                depth: 0,
                author: Some("x".into()),
                stickied: false,
            },
            Comment {
                id: "b".into(),
                body: "Second".into(),
                score: 3,
                depth: 0,
                author: Some("y".into()),
                stickied: false,
            },
        ];
        let chunks = segment("ignored body", &comments, 5, false);
        assert_eq!(texts(&chunks), vec!["First comment", "Second"]);
        assert!(chunks.iter().all(|c| c.kind == ChunkKind::Comment));
    }

    #[test]
    fn title_is_prepended_and_indices_renumbered() {
        let body = segment_text("Hello there.\n:)\nGeneral Kenobi.", 12);
        assert_eq!(texts(&body), vec!["Hello there.", ":)", "General", "Kenobi."]);
        let chunks = with_title("A title", 12, body);
        assert_eq!(texts(&chunks), vec!["A title", "Hello there.", "General", "Kenobi."]);
        assert_eq!(chunks[0].kind, ChunkKind::Title);
        assert_eq!(
            chunks.iter().map(|c| c.index).collect::<Vec<_>>(),
            (0..chunks.len()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn word_pieces_do_not_absorb_neighbouring_sentences() {
        let chunks = segment_text("Ok. This sentence is far too long. Fine.", 12);
        assert_eq!(
            texts(&chunks),
            vec!["Ok.", "This", "sentence is", "far too long.", "Fine."]
        );
        let long = "This sentence is far too long.";
        let pieces: Vec<&str> = texts(&chunks)[1..4].to_vec();
        assert_eq!(pieces.join(" "), long);
    }

    #[test]
    fn long_titles_are_split_within_the_limit() {
        let title = "My landlord kept my deposit. Then he asked me for a reference letter";
        let chunks = with_title(title, 20, segment_text("Body text.", 20));
        let titles: Vec<&TextChunk> = chunks.iter().filter(|c| c.kind == ChunkKind::Title).collect();
        assert!(titles.len() > 1);
        for chunk in &titles {
            assert!(measured_len(&chunk.text) <= 20, "{:?}", chunk.text);
        }
        let joined = titles.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" ");
        assert_eq!(joined, title);
        assert_eq!(chunks.last().map(|c| c.kind), Some(ChunkKind::Body));
        assert_eq!(chunks.last().map(|c| c.index), Some(chunks.len() - 1));
    }

    #[test]
    fn blank_title_adds_no_chunk() {
        let chunks = with_title("   ", 20, segment_text("Body text.", 20));
        assert_eq!(texts(&chunks), vec!["Body text."]);
        assert_eq!(chunks[0].index, 0);
    }
}
