use chrono::Utc;

/// Framed transcript document stored as the `transcriptions/` artifact.
pub fn transcript_document(
    title: &str,
    description: &str,
    video_url: &str,
    transcription: &str,
) -> String {
    let date = Utc::now().format("%Y-%m-%d %H:%M:%S");
    format!(
        "Lecture: {title}\n\n\
         Date: {date}\n\n\
         Description: {description}\n\n\
         Video URL: {video_url}\n\n\
         --- TRANSCRIPTION ---\n\n\
         {transcription}\n\n\
         --- END OF TRANSCRIPTION ---\n"
    )
}

/// Plain-text notes abstract stored alongside the PDF.
pub fn notes_abstract(title: &str, summary: &str) -> String {
    let date = Utc::now().format("%Y-%m-%d %H:%M:%S");
    format!(
        "LECTURE NOTES: {title}\n\
         Generated on: {date}\n\
         =========================================\n\n\
         {summary}\n"
    )
}

/// Minimally structured stand-in used when the summarizer is unavailable:
/// a leading excerpt plus one bullet per transcript paragraph. Keeps the
/// synthesize stage non-fatal without pretending to be a real summary.
pub fn outline_fallback(transcript: &str) -> String {
    let excerpt: String = transcript.chars().take(500).collect();
    let ellipsis = if transcript.chars().count() > 500 {
        "..."
    } else {
        ""
    };

    let mut outline = format!("SUMMARY (excerpt):\n{}{}\n\nKEY POINTS:\n", excerpt.trim(), ellipsis);

    let mut bullets = 0;
    for paragraph in transcript.split("\n\n") {
        let line = paragraph.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            continue;
        }
        let head: String = line.chars().take(160).collect();
        outline.push_str(&format!("- {head}\n"));
        bullets += 1;
        if bullets == 12 {
            break;
        }
    }

    if bullets == 0 {
        outline.push_str("- (no transcript content)\n");
    }
    outline
}
