//! Record display for the read-side commands.
//!
//! `larder get`, `random`, `search`, `list`, and `live` all end by printing
//! records. Human output goes through [`print_record`] / [`print_summary`];
//! `--json` output is the serialized [`Record`].

use anyhow::Result;

use crate::models::Record;
use crate::store::LocalStore;

/// Full record: header fields, then numbered ingredients and steps.
pub fn print_record(record: &Record) {
    println!("--- Record {} ---", record.id);
    println!("title:      {}", record.title);
    println!("url:        {}", record.url);
    if let Some(category) = &record.category {
        println!("category:   {}", category);
    }
    if let Some(minutes) = &record.total_time {
        println!("total time: {} min", minutes);
    }
    if let Some(image) = &record.image_url {
        println!("image:      {}", image);
    }
    println!();

    println!("--- Ingredients ({}) ---", record.ingredients.len());
    for ingredient in &record.ingredients {
        println!("- {}", ingredient);
    }
    println!();

    println!("--- Instructions ({}) ---", record.instructions.len());
    for (i, step) in record.instructions.iter().enumerate() {
        println!("{}. {}", i + 1, step);
    }
    println!();
}

/// One line per record, for lists.
pub fn print_summary(records: &[Record]) {
    if records.is_empty() {
        println!("No records found.");
        return;
    }
    for record in records {
        println!("{}", summary_line(record));
    }
}

pub fn summary_line(record: &Record) -> String {
    let mut line = format!("{:>5}  {}", record.id, record.title);
    if let Some(category) = &record.category {
        line.push_str(&format!("  [{}]", category));
    }
    if let Some(minutes) = &record.total_time {
        line.push_str(&format!("  {} min", minutes));
    }
    line
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `larder get <id>`. A missing id is an error so the exit code is non-zero.
pub async fn run_get(store: &LocalStore, id: i64, json: bool) -> Result<()> {
    let Some(record) = store.get(id).await? else {
        anyhow::bail!("record not found: {}", id);
    };
    if json {
        print_json(&record)
    } else {
        print_record(&record);
        Ok(())
    }
}

/// `larder random`. An empty store prints a notice, not an error.
pub async fn run_random(store: &LocalStore, json: bool) -> Result<()> {
    match store.random_record().await? {
        Some(record) if json => print_json(&record)?,
        Some(record) => print_record(&record),
        None if json => println!("null"),
        None => println!("No records yet. Try `larder live <query>` or `larder seed`."),
    }
    Ok(())
}

pub fn print_records(records: &[Record], json: bool) -> Result<()> {
    if json {
        print_json(&records)
    } else {
        print_summary(records);
        Ok(())
    }
}
