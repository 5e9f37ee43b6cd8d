use std::collections::HashSet;

use corkboard::config::BoardConfig;
use corkboard::sync::api::NotesApi;
use corkboard::sync::tokens::EditTokenStore;
use uuid::Uuid;

#[tokio::main]
async fn main() {
    systemd_journal_logger::JournalLog::new()
        .unwrap()
        .with_syslog_identifier("board-check".to_string())
        .install()
        .unwrap();
    log::set_max_level(log::LevelFilter::Info);

    let config = BoardConfig::load();
    corkboard::set_debug_logging(config.debug_logging);

    println!("=== Board vs Local Comparison ===\n");

    let tokens = EditTokenStore::open(config.tokens_path());
    println!("Local: {} edit tokens\n", tokens.len());

    println!("--- Server: {} ---", config.server_url);
    let api = match NotesApi::new(&config.server_url) {
        Ok(a) => a,
        Err(e) => {
            println!("  Client error: {}", e);
            return;
        }
    };

    let notes = match api.list_notes().await {
        Ok(n) => n,
        Err(e) => {
            println!("  Failed to list notes: {}", e);
            return;
        }
    };
    println!("  Remote: {} notes\n", notes.len());

    // Notes this device can still move or delete.
    let remote_ids: HashSet<Uuid> = notes.iter().map(|n| n.id).collect();
    let mut owned = 0;
    for note in &notes {
        if tokens.is_owner(note.id) {
            owned += 1;
            println!(
                "  owned: {}  \"{}\" -> \"{}\"  at ({:.0}, {:.0})",
                note.id, note.author, note.recipient, note.x, note.y
            );
        }
    }
    if owned == 0 {
        println!("  (no notes owned by this device)");
    }

    // Tokens whose notes are gone; safe to prune.
    let orphaned: Vec<Uuid> = tokens
        .owned_ids()
        .filter(|id| !remote_ids.contains(id))
        .collect();
    if !orphaned.is_empty() {
        println!("\n  Orphaned tokens ({}):", orphaned.len());
        for id in &orphaned {
            println!("    {}", id);
        }
    }

    // Placement is best-effort, so report pairs the policy would object to.
    let policy = config.overlap_policy;
    let mut violations = 0;
    for (i, a) in notes.iter().enumerate() {
        for b in notes.iter().skip(i + 1) {
            if policy.overlaps_too_much(&a.rect(), &b.rect()) {
                violations += 1;
                println!(
                    "  overlap: {} at ({:.0}, {:.0}) vs {} at ({:.0}, {:.0})",
                    a.id, a.x, a.y, b.id, b.x, b.y
                );
            }
        }
    }

    println!(
        "\nSummary: {} notes, {} owned here, {} orphaned tokens, {} overlapping pairs",
        notes.len(),
        owned,
        orphaned.len(),
        violations
    );
}
