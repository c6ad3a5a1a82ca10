#![cfg(target_arch = "wasm32")]

use stream_dom::{
	relay::relay,
	template::{AttributeChange, DynamicListChange, Element, Template},
	web::WebDom,
};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{window, HtmlBodyElement};

wasm_bindgen_test_configure!(run_in_browser);

static mut LOG_INITIALIZED: bool = false;

fn setup() -> (WebDom, HtmlBodyElement) {
	unsafe {
		if !LOG_INITIALIZED {
			tracing_wasm::set_as_global_default();
			LOG_INITIALIZED = true;
		}
	}

	let dom = WebDom::from_window().unwrap();
	let body = dom.document().body().unwrap().dyn_into::<HtmlBodyElement>().unwrap();
	body.set_inner_html("");
	(dom, body)
}

/// Yields to the browser's event loop, so that spawned tasks can run.
async fn settle() {
	let promise = js_sys::Promise::new(&mut |resolve, _| {
		window().unwrap().set_timeout_with_callback(&resolve).unwrap();
	});
	JsFuture::from(promise).await.unwrap();
}

#[wasm_bindgen_test]
async fn element_with_live_text() {
	let (dom, body) = setup();
	let (text, texts) = relay::<String>();
	let (attribute, attributes) = relay::<AttributeChange>();

	let trigger = dom.spawn_mount(
		body.clone().into(),
		Element::new("p").with_attributes(attributes).with_body(Template::live_text(texts)).into(),
	);
	settle().await;
	assert_eq!(body.inner_html(), "<p></p>");

	text.send("Hello stream-dom!".to_owned());
	attribute.send(AttributeChange::set("id", "greeting"));
	settle().await;
	assert_eq!(body.inner_html(), "<p id=\"greeting\">Hello stream-dom!</p>");

	trigger.cancel();
	settle().await;
	assert_eq!(body.inner_html(), "");
}

#[wasm_bindgen_test]
async fn dynamic_list() {
	let (dom, body) = setup();
	let (change, changes) = relay();

	let trigger = dom.spawn_mount(body.clone().into(), Element::new("ul").with_body(Template::dynamic_list(changes)).into());
	settle().await;

	change.send(DynamicListChange::insert(0, Element::new("li").with_body("b")));
	change.send(DynamicListChange::insert(0, Element::new("li").with_body("a")));
	settle().await;
	assert_eq!(body.inner_html(), "<ul><!--list item--><li>a</li><!--list item--><li>b</li><!--list end--></ul>");

	change.send(DynamicListChange::remove(1));
	settle().await;
	assert_eq!(body.inner_html(), "<ul><!--list item--><li>a</li><!--list end--></ul>");

	trigger.cancel();
	settle().await;
	assert_eq!(body.inner_html(), "");
}
