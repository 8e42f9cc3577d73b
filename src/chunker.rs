//! Heading-boundary document chunker.
//!
//! Splits heading-structured governance text into ordered [`DraftChunk`]s.
//! A line opening with 1–3 `#` characters followed by whitespace and a
//! title starts a new chunk at that heading level; 4+ `#` lines are plain
//! content. Text before the first heading is discarded, so a document with
//! no headings produces no chunks.
//!
//! A second pass re-splits oversized sections: any chunk at heading level
//! 1–2 whose content exceeds `split_threshold` lines is divided at its
//! embedded `###` sub-headings, each sub-chunk labeled
//! `"<parent section> > <sub-heading>"` and keeping the parent's heading
//! level. The parent's lines before the first sub-heading travel with the
//! first sub-chunk, so concatenating the sub-chunks' contents reconstructs
//! the parent. A section without sub-headings stays whole regardless of
//! size.

use crate::models::DraftChunk;

/// Parse a heading line: 1–3 `#`, at least one space or tab, a non-empty
/// title. Returns the level and the trimmed title.
fn parse_heading(line: &str) -> Option<(usize, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=3).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }
    let title = rest.trim();
    if title.is_empty() {
        return None;
    }
    Some((hashes, title))
}

/// Split a document into ordered chunks, sub-splitting oversized sections.
///
/// Chunk content is the accumulated lines of the section (heading line
/// included), trimmed. A heading directly followed by another heading
/// yields a chunk whose content is just its heading line.
pub fn chunk_document(text: &str, split_threshold: usize) -> Vec<DraftChunk> {
    let mut chunks: Vec<DraftChunk> = Vec::new();
    let mut section: Option<(String, i64)> = None;
    let mut lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some((level, title)) = parse_heading(line) {
            if let Some((name, heading_level)) = section.take() {
                chunks.push(DraftChunk {
                    section: name,
                    heading_level,
                    content: lines.join("\n").trim().to_string(),
                });
            }
            section = Some((title.to_string(), level as i64));
            lines = vec![line];
        } else {
            lines.push(line);
        }
    }

    if let Some((name, heading_level)) = section {
        chunks.push(DraftChunk {
            section: name,
            heading_level,
            content: lines.join("\n").trim().to_string(),
        });
    }

    split_oversized(chunks, split_threshold)
}

fn split_oversized(chunks: Vec<DraftChunk>, split_threshold: usize) -> Vec<DraftChunk> {
    let mut out = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if chunk.heading_level > 2 || chunk.content.lines().count() <= split_threshold {
            out.push(chunk);
            continue;
        }
        match split_by_subheadings(&chunk) {
            Some(subs) => out.extend(subs),
            None => out.push(chunk),
        }
    }
    out
}

/// Split a parent chunk at its level-3 sub-headings. Returns `None` when
/// the content has no sub-headings.
fn split_by_subheadings(parent: &DraftChunk) -> Option<Vec<DraftChunk>> {
    let mut preamble: Vec<&str> = Vec::new();
    let mut segments: Vec<(String, Vec<&str>)> = Vec::new();

    for line in parent.content.lines() {
        match parse_heading(line) {
            Some((3, title)) => segments.push((title.to_string(), vec![line])),
            _ => match segments.last_mut() {
                Some((_, seg_lines)) => seg_lines.push(line),
                None => preamble.push(line),
            },
        }
    }

    if segments.is_empty() {
        return None;
    }

    let mut subs = Vec::with_capacity(segments.len());
    for (i, (title, mut seg_lines)) in segments.into_iter().enumerate() {
        if i == 0 && !preamble.is_empty() {
            let mut merged = std::mem::take(&mut preamble);
            merged.append(&mut seg_lines);
            seg_lines = merged;
        }
        subs.push(DraftChunk {
            section: format!("{} > {}", parent.section, title),
            heading_level: parent.heading_level,
            content: seg_lines.join("\n").trim().to_string(),
        });
    }
    Some(subs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: usize = 150;

    #[test]
    fn test_splits_on_headings_in_order() {
        let doc = "# Overview\nIntro text.\n\n## QA Gates\nGate rules.\n\n### Release\nShip steps.";
        let chunks = chunk_document(doc, THRESHOLD);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].section, "Overview");
        assert_eq!(chunks[0].heading_level, 1);
        assert_eq!(chunks[1].section, "QA Gates");
        assert_eq!(chunks[1].heading_level, 2);
        assert_eq!(chunks[2].section, "Release");
        assert_eq!(chunks[2].heading_level, 3);
    }

    #[test]
    fn test_content_includes_heading_line_and_is_trimmed() {
        let doc = "## Policy\n\nBody line.\n\n";
        let chunks = chunk_document(doc, THRESHOLD);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "## Policy\n\nBody line.");
    }

    #[test]
    fn test_preamble_before_first_heading_is_discarded() {
        let doc = "Loose intro line.\nAnother loose line.\n# First Section\nBody.";
        let chunks = chunk_document(doc, THRESHOLD);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].section, "First Section");
        assert!(!chunks[0].content.contains("Loose intro"));
    }

    #[test]
    fn test_no_headings_yields_no_chunks() {
        let chunks = chunk_document("Just prose.\nNo structure at all.", THRESHOLD);
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_four_hashes_are_content_not_boundaries() {
        let doc = "## Section\n#### Not a boundary\nStill the same chunk.";
        let chunks = chunk_document(doc, THRESHOLD);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("#### Not a boundary"));
    }

    #[test]
    fn test_hashes_without_whitespace_are_content() {
        let doc = "## Real\n#hashtag line\n##another";
        let chunks = chunk_document(doc, THRESHOLD);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("#hashtag line"));
        assert!(chunks[0].content.contains("##another"));
    }

    #[test]
    fn test_heading_only_chunk_content_is_heading_line() {
        let doc = "# Alpha\n# Beta\nBody.";
        let chunks = chunk_document(doc, THRESHOLD);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "# Alpha");
    }

    fn oversized_section(sub_count: usize, lines_per_sub: usize) -> String {
        let mut doc = String::from("## Big Section\nlead-in one\nlead-in two\n");
        for s in 0..sub_count {
            doc.push_str(&format!("### Sub {}\n", s));
            for l in 0..lines_per_sub {
                doc.push_str(&format!("detail {} {}\n", s, l));
            }
        }
        doc
    }

    #[test]
    fn test_oversized_section_splits_into_m_subchunks() {
        let doc = oversized_section(4, 60);
        let chunks = chunk_document(&doc, THRESHOLD);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].section, "Big Section > Sub 0");
        assert_eq!(chunks[3].section, "Big Section > Sub 3");
        for c in &chunks {
            assert_eq!(c.heading_level, 2);
        }
    }

    #[test]
    fn test_subchunks_reconstruct_parent_content() {
        let doc = oversized_section(3, 70);
        let parent = chunk_document(&doc, usize::MAX);
        assert_eq!(parent.len(), 1);

        let subs = chunk_document(&doc, THRESHOLD);
        assert_eq!(subs.len(), 3);
        let rebuilt = subs
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(rebuilt, parent[0].content);
    }

    #[test]
    fn test_preamble_attaches_to_first_subchunk() {
        let doc = oversized_section(2, 100);
        let chunks = chunk_document(&doc, THRESHOLD);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].content.starts_with("## Big Section"));
        assert!(chunks[0].content.contains("lead-in two"));
        assert!(chunks[1].content.starts_with("### Sub 1"));
    }

    #[test]
    fn test_oversized_section_without_subheadings_stays_whole() {
        let mut doc = String::from("## Flat Section\n");
        for i in 0..300 {
            doc.push_str(&format!("line {}\n", i));
        }
        let chunks = chunk_document(&doc, THRESHOLD);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].section, "Flat Section");
    }

    #[test]
    fn test_level_three_sections_never_subsplit() {
        let mut doc = String::from("### Deep Section\n");
        for i in 0..300 {
            doc.push_str(&format!("line {}\n", i));
        }
        let chunks = chunk_document(&doc, THRESHOLD);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_at_threshold_is_not_split() {
        // Exactly threshold lines of content must stay whole.
        let mut doc = String::from("## Edge\n### Sub A\n");
        for i in 0..(THRESHOLD - 2) {
            doc.push_str(&format!("line {}\n", i));
        }
        let chunks = chunk_document(&doc, THRESHOLD);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].section, "Edge");
    }

    #[test]
    fn test_deterministic() {
        let doc = oversized_section(3, 80);
        let a = chunk_document(&doc, THRESHOLD);
        let b = chunk_document(&doc, THRESHOLD);
        assert_eq!(a, b);
    }
}
