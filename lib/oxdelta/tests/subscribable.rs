#![cfg(test)]
#![allow(clippy::panic_in_result_fn)]

use oxdelta::model::*;
use oxdelta::{
    ChangeListener, Dataset, DatasetChanges, QuadPattern, ReadableDataset, SubscribableDataset,
    TransactionId, UpdatableDataset,
};
use std::cell::RefCell;
use std::convert::Infallible;
use std::error::Error;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<(DatasetChanges, TransactionId, QuadPattern)>>>;

fn ex(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://example.com/{name}"))
}

fn quad(s: &str, p: &str, o: &str) -> Quad {
    Quad::new(ex(s), ex(p), ex(o), GraphName::DefaultGraph)
}

fn recorder(log: &Log) -> ChangeListener {
    let log = Rc::clone(log);
    ChangeListener::new(move |changes, transaction_id, pattern| {
        log.borrow_mut()
            .push((changes.clone(), transaction_id, pattern.clone()));
    })
}

#[test]
fn test_tom_color() -> Result<(), Box<dyn Error>> {
    let mut dataset = SubscribableDataset::new();
    dataset.insert(quad("Tom", "type", "Cat").as_ref())?;
    let log = Log::default();
    let tom = QuadPattern::new().with_subject(ex("Tom"));
    dataset.on(&tom, recorder(&log));

    dataset.insert(quad("Tom", "color", "Grey").as_ref())?;

    let log = log.borrow();
    assert_eq!(log.len(), 1);
    let (changes, _, pattern) = &log[0];
    assert_eq!(changes.added.len(), 1);
    assert!(changes.added.contains(&quad("Tom", "color", "Grey")));
    assert_eq!(*pattern, tom);
    Ok(())
}

#[test]
fn test_every_fan_out_pattern_is_notified() -> Result<(), Box<dyn Error>> {
    let log = Log::default();
    let mut dataset = SubscribableDataset::new().with_max_listeners(0);
    let target = Quad::new(
        ex("Tom"),
        ex("name"),
        Literal::new_language_tagged_literal_unchecked("Tom", "en"),
        ex("g"),
    );
    for pattern in QuadPattern::fan_out(target.as_ref()) {
        dataset.on(&pattern, recorder(&log));
    }
    dataset.insert(target.as_ref())?;
    assert_eq!(log.borrow().len(), 16);
    let transaction_id = log.borrow()[0].1;
    assert!(log.borrow().iter().all(|(_, id, _)| *id == transaction_id));
    assert!(
        log.borrow()
            .iter()
            .zip(QuadPattern::fan_out(target.as_ref()))
            .all(|((_, _, notified), expected)| *notified == expected)
    );

    // A quad differing in every position only reaches the wildcard.
    log.borrow_mut().clear();
    dataset.insert(
        Quad::new(
            ex("Felix"),
            ex("color"),
            Literal::new_simple_literal("Tom"),
            GraphName::DefaultGraph,
        )
        .as_ref(),
    )?;
    assert_eq!(log.borrow().len(), 1);
    assert!(log.borrow()[0].2.is_wildcard());
    Ok(())
}

#[test]
fn test_remove_matches_notifies_removed_side() -> Result<(), Box<dyn Error>> {
    let log = Log::default();
    let mut dataset = SubscribableDataset::from(
        [
            quad("Tom", "type", "Cat"),
            quad("Tom", "color", "Grey"),
            quad("Felix", "type", "Cat"),
        ]
        .iter()
        .collect::<Dataset>(),
    );
    let cats = QuadPattern::new().with_object(ex("Cat"));
    dataset.on(&cats, recorder(&log));
    dataset.remove_matches(&QuadPattern::new().with_subject(ex("Tom")))?;
    let log = log.borrow();
    assert_eq!(log.len(), 1);
    assert!(log[0].0.added.is_empty());
    assert_eq!(
        log[0].0.removed,
        [quad("Tom", "type", "Cat")].iter().collect::<Dataset>()
    );
    assert_eq!(dataset.len(), 1);
    Ok(())
}

#[test]
fn test_bulk_loader_notifies_per_batch() -> Result<(), Box<dyn Error>> {
    let log = Log::default();
    let mut dataset = SubscribableDataset::new();
    dataset.on(&QuadPattern::new(), recorder(&log));
    let count = dataset
        .bulk_loader()
        .with_batch_size(3)
        .load_quads::<Infallible, Infallible>(
            (0..7).map(|i| Ok(quad(&format!("cat{i}"), "type", "Cat"))),
        )?;
    assert_eq!(count, 7);
    assert_eq!(dataset.len(), 7);
    let sizes: Vec<_> = log.borrow().iter().map(|(c, _, _)| c.added.len()).collect();
    assert_eq!(sizes, [3, 3, 1]);
    Ok(())
}

#[test]
fn test_listener_identity() -> Result<(), Box<dyn Error>> {
    let log = Log::default();
    let mut dataset = SubscribableDataset::new();
    let listener = recorder(&log);
    let tom = QuadPattern::new().with_subject(ex("Tom"));
    let cats = QuadPattern::new().with_object(ex("Cat"));
    dataset.on(&tom, listener.clone());
    dataset.on(&cats, listener.clone());
    dataset.on(&cats, recorder(&log));
    assert_eq!(dataset.listener_count(&cats), 2);

    assert_eq!(dataset.remove_listener_from_all_events(&listener), 2);
    assert_eq!(dataset.listener_count(&tom), 0);
    assert_eq!(dataset.listener_count(&cats), 1);
    assert_eq!(dataset.event_names()?, [cats]);

    dataset.insert(quad("Tom", "type", "Cat").as_ref())?;
    assert_eq!(log.borrow().len(), 1);
    Ok(())
}

#[test]
fn test_prepend_once() -> Result<(), Box<dyn Error>> {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let named = |name: &'static str| {
        let calls = Rc::clone(&calls);
        ChangeListener::new(move |_, _, _| calls.borrow_mut().push(name))
    };
    let all = QuadPattern::new();
    let mut dataset = SubscribableDataset::new();
    dataset.on(&all, named("first"));
    dataset.prepend_once_listener(&all, named("urgent"));
    dataset.insert(quad("Tom", "type", "Cat").as_ref())?;
    dataset.insert(quad("Tom", "color", "Grey").as_ref())?;
    assert_eq!(*calls.borrow(), ["urgent", "first", "first"]);
    Ok(())
}

#[test]
fn test_into_dataset() -> Result<(), Box<dyn Error>> {
    let mut dataset = SubscribableDataset::new();
    dataset.insert(quad("Tom", "type", "Cat").as_ref())?;
    assert_eq!(dataset.dataset().len(), 1);
    let dataset = dataset.into_dataset();
    assert!(dataset.contains(&quad("Tom", "type", "Cat")));
    Ok(())
}
