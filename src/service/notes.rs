use url::form_urlencoded;

use crate::config::Note;
use crate::models::ActiveNote;

/// Notices whose `active_till` is unset or still ahead of `now`, with links
/// form-encoded for embedding in the frontend
pub fn active_notes_at(notes: &[Note], now: i64) -> Vec<ActiveNote> {
    let has_next = notes.len() > 1;
    notes
        .iter()
        .filter(|note| note.active_till.map_or(true, |till| till > now))
        .map(|note| {
            let mut note = note.clone();
            note.link = form_urlencoded::byte_serialize(note.link.as_bytes()).collect();
            ActiveNote { note, has_next }
        })
        .collect()
}
