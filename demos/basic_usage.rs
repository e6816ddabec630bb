// SPDX-License-Identifier: MIT
//! Basic usage example for SQDoc

use sqdoc::{
    inspect_envelope, inspect_layout, load, load_with_options, save, save_with_options, Document,
    EncryptionOptions, FontFamily, LoadOptions, SaveOptions, StyleAttr, StyleRun, TextBlock,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "sqdoc=debug".into()))
        .init();

    println!("=== SQDoc - Basic Usage ===\n");

    // Step 1: Build a document
    println!("1. Building document...");
    let mut doc = Document::new("Alex", "Draft");
    doc.metadata.paged_mode = true;
    doc.metadata.preferred_font_family = FontFamily::Serif;

    let bold = StyleAttr {
        bold: true,
        ..StyleAttr::default()
    };
    let code = StyleAttr {
        font_family: FontFamily::Monospace,
        color_rgba: 0x0055_AAFF,
        ..StyleAttr::default()
    };
    doc.push_text(
        1,
        TextBlock::new("Hello SQDoc").with_runs(vec![StyleRun::new(0, 5, bold)]),
    );
    doc.push_text(
        2,
        TextBlock::new("Run sqdoc::save() to persist.").with_runs(vec![StyleRun::new(4, 16, code)]),
    );
    println!("   Blocks: {}", doc.blocks.len());

    // Step 2: Show the byte layout
    println!("\n2. Layout:");
    let layout = inspect_layout(&doc)?;
    println!("{}", serde_json::to_string_pretty(&layout)?);

    // Step 3: Plain save and load
    let dir = std::env::temp_dir().join(format!("sqdoc-demo-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir)?;
    let plain = dir.join("draft.sqdoc");
    println!("\n3. Saving plain container to {}", plain.display());
    save(&plain, &mut doc)?;
    let loaded = load(&plain)?;
    println!("   Loaded \"{}\" by {}", loaded.metadata.title, loaded.metadata.author);

    // Step 4: Compressed and encrypted save
    let secure = dir.join("draft.secure.sqdoc");
    println!("\n4. Saving encrypted container to {}", secure.display());
    let opts = SaveOptions {
        compression: true,
        encryption: EncryptionOptions::with_password("hunter2"),
    };
    save_with_options(&secure, &mut doc, &opts)?;
    println!("   Envelope: {}", serde_json::to_string(&inspect_envelope(&secure)?)?);

    match load(&secure) {
        Err(e) => println!("   Without password: {}", e),
        Ok(_) => println!("   Without password: unexpectedly loaded"),
    }
    let unlocked = load_with_options(&secure, &LoadOptions::with_password("hunter2"))?;
    for block in &unlocked.blocks {
        if let Some(text) = block.text.as_ref().and_then(|t| t.as_str()) {
            println!("   Block {}: {}", block.id, text);
        }
    }

    std::fs::remove_dir_all(&dir)?;
    println!("\n=== Done ===");
    Ok(())
}
