//! Watches the color of a cat while it is updated directly, in a transaction and by a bulk load.
//!
//! Run with: cargo run -p oxdelta --example color_watch

use oxdelta::model::*;
use oxdelta::{ChangeListener, QuadPattern, SubscribableDataset, UpdatableDataset};
use std::convert::Infallible;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let tom = NamedNode::new("http://example.com/Tom")?;
    let color = NamedNode::new("http://example.com/color")?;
    let colored = |name: &str| {
        Quad::new(
            tom.clone(),
            color.clone(),
            Literal::new_simple_literal(name),
            GraphName::DefaultGraph,
        )
    };

    let mut dataset = SubscribableDataset::new();
    dataset.on(
        &QuadPattern::new()
            .with_subject(tom.clone())
            .with_predicate(color.clone()),
        ChangeListener::new(|changes, transaction_id, pattern| {
            println!("[{transaction_id}] on {pattern}");
            for quad in &changes.removed {
                println!("  - {quad}");
            }
            for quad in &changes.added {
                println!("  + {quad}");
            }
        }),
    );

    println!("Direct insertion:");
    dataset.insert(colored("black").as_ref())?;

    println!("Transaction:");
    let mut transaction = dataset.start_transaction();
    transaction.remove(colored("black").as_ref())?;
    transaction.insert(colored("grey").as_ref())?;
    transaction.commit()?;

    println!("Rollback:");
    transaction.rollback()?;

    println!("Bulk load:");
    let count = dataset
        .bulk_loader()
        .with_batch_size(2)
        .on_progress(|count| println!("  {count} quads loaded"))
        .load_quads::<Infallible, Infallible>(
            ["white", "ginger", "tabby"]
                .into_iter()
                .map(|name| Ok(colored(name))),
        )?;
    println!("{count} quads read, the dataset now contains:");
    print!("{}", dataset.dataset());
    Ok(())
}
