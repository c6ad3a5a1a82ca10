use memory_harness_::Harness;

use async_stream::stream;
use futures::StreamExt;
use stream_dom::{
	cancel::CancelSignal,
	construct::{fixed_children, single_child},
	dom::Dom,
	error::RenderError,
	relay::{relay, Relay},
	stream::CancelStream,
	template::{AttributeChange, DynamicListChange, Element, Template},
};

fn fixed(changes: Vec<DynamicListChange>) -> Template {
	Template::dynamic_list(CancelStream::iter(changes))
}

#[test]
fn insert_then_remove_first() {
	let mut harness = Harness::mount(fixed(vec![
		DynamicListChange::insert(0, "a"),
		DynamicListChange::insert(1, "b"),
		DynamicListChange::remove(0),
	]));
	assert_eq!(harness.html(), "<!--list item-->b<!--list end-->");

	harness.cancel();
	assert_eq!(harness.html(), "");
	assert_eq!(harness.outcome(), Some(Ok(())));
}

#[test]
fn indices_follow_live_order() {
	let harness = Harness::mount(fixed(vec![
		DynamicListChange::insert(0, "c"),
		DynamicListChange::insert(0, "a"),
		DynamicListChange::insert(1, "b"),
		DynamicListChange::remove(2),
		DynamicListChange::insert(2, Template::list(vec!["d".into(), "e".into()])),
		DynamicListChange::remove(0),
	]));
	assert_eq!(harness.html(), "<!--list item-->b<!--list item-->de<!--list end-->");
}

#[test]
fn multi_node_items_are_removed_whole() {
	let (change, changes) = relay();
	let mut harness = Harness::mount(Template::dynamic_list(changes));

	change.send(DynamicListChange::insert(0, Template::list(vec!["1".into(), "2".into(), "3".into()])));
	change.send(DynamicListChange::insert(1, "x"));
	harness.settle();
	assert_eq!(harness.html(), "<!--list item-->123<!--list item-->x<!--list end-->");

	change.send(DynamicListChange::remove(0));
	harness.settle();
	assert_eq!(harness.html(), "<!--list item-->x<!--list end-->");
}

#[test]
fn items_stay_live() {
	let (change, changes) = relay();
	let (text, texts) = relay::<String>();
	let mut harness = Harness::mount(Template::dynamic_list(changes));

	change.send(DynamicListChange::insert(0, Template::live_text(texts)));
	harness.settle();
	text.send("one".to_owned());
	harness.settle();
	assert_eq!(harness.html(), "<!--list item-->one<!--list end-->");

	text.send("two".to_owned());
	harness.settle();
	assert_eq!(harness.html(), "<!--list item-->two<!--list end-->");

	change.send(DynamicListChange::remove(0));
	harness.settle();
	assert_eq!(harness.html(), "<!--list end-->");
	assert_eq!(text.subscriber_count(), 0);
}

/// An element whose teardown only completes once `gate` fires.
fn gated(gate: &Relay<()>, label: &str) -> Template {
	let gate = gate.clone();
	let attributes = CancelStream::new(move |signal: CancelSignal| {
		let gate = gate.clone();
		stream! {
			yield AttributeChange::set("data-state", "live");
			signal.cancelled().await;
			gate.stream().start(CancelSignal::never()).next().await;
		}
	});
	Element::new("li").with_attributes(attributes).with_body(label).into()
}

#[test]
fn cancellation_waits_for_removal_in_progress() {
	let gate = Relay::new();
	let (change, changes) = relay();
	let mut harness = Harness::mount(Template::dynamic_list(changes));

	change.send(DynamicListChange::insert(0, gated(&gate, "a")));
	change.send(DynamicListChange::insert(1, "b"));
	harness.settle();
	assert_eq!(harness.html(), "<!--list item--><li data-state=\"live\">a</li><!--list item-->b<!--list end-->");

	// The item's body is gone, but the element stays attached until its teardown completes.
	change.send(DynamicListChange::remove(0));
	harness.settle();
	assert_eq!(harness.html(), "<!--list item--><li data-state=\"live\"></li><!--list item-->b<!--list end-->");

	harness.cancel();
	assert_eq!(harness.outcome(), None);
	assert_eq!(harness.html(), "<!--list item--><li data-state=\"live\"></li><!--list item--><!--list end-->");

	gate.send(());
	harness.settle();
	assert_eq!(harness.html(), "");
	assert_eq!(harness.outcome(), Some(Ok(())));
}

#[test]
fn out_of_bounds_insert_is_fatal() {
	let harness = Harness::mount(fixed(vec![DynamicListChange::insert(1, "x")]));
	assert_eq!(harness.outcome(), Some(Err(RenderError::InsertOutOfBounds { index: 1, len: 0 })));
	assert_eq!(harness.html(), "<!--list end-->");
}

#[test]
fn out_of_bounds_remove_is_fatal() {
	let harness = Harness::mount(fixed(vec![DynamicListChange::insert(0, "x"), DynamicListChange::remove(1)]));
	assert_eq!(harness.outcome(), Some(Err(RenderError::RemoveOutOfBounds { index: 1, len: 1 })));
}

#[test]
fn constructed_children() {
	let template = Element::new("ul").with_body(Template::dynamic_list(fixed_children(vec!["a".into(), "b".into()])));
	let harness = Harness::mount(template.into());
	assert_eq!(harness.html(), "<ul><!--list item-->a<!--list item-->b<!--list end--></ul>");

	let (template, templates) = relay::<Template>();
	let mut harness = Harness::mount(Template::dynamic_list(single_child(templates)));
	template.send("first".into());
	harness.settle();
	template.send("second".into());
	harness.settle();
	assert_eq!(harness.html(), "<!--list item-->second<!--list end-->");
}

#[test]
fn detached_item_marker_is_fatal() {
	let (change, changes) = relay();
	let mut harness = Harness::mount(Template::dynamic_list(changes));

	change.send(DynamicListChange::insert(0, "a"));
	change.send(DynamicListChange::insert(1, "b"));
	harness.settle();
	let nodes = harness.dom.children(harness.root);
	assert_eq!(harness.html(), "<!--list item-->a<!--list item-->b<!--list end-->");

	// The second item's start marker bounds the first item's region.
	harness.dom.remove(&nodes[2]).unwrap();
	change.send(DynamicListChange::remove(0));
	harness.settle();
	assert_eq!(harness.outcome(), Some(Err(RenderError::MissingMarker("list item"))));
}
