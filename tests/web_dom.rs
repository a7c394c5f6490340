#![cfg(target_arch = "wasm32")]

use js_sys::{Function, Object, Promise, Reflect};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::{Document, Element, HtmlInputElement, Window};

use ollama_translator::dom::{EditSurface, ElementShape};
use ollama_translator::web::{Ticker, WebElement};

wasm_bindgen_test_configure!(run_in_browser);

fn window() -> Window {
    web_sys::window().unwrap()
}

fn document() -> Document {
    window().document().unwrap()
}

fn attach(tag: &str) -> Element {
    let doc = document();
    let el = doc.create_element(tag).unwrap();
    doc.body().unwrap().append_child(&el).unwrap();
    el
}

fn input(kind: &str) -> Element {
    let el = attach("input");
    el.set_attribute("type", kind).unwrap();
    el
}

fn editable_div() -> Element {
    let el = attach("div");
    el.set_attribute("contenteditable", "true").unwrap();
    el
}

fn wrap(el: Element) -> WebElement {
    WebElement::new(el, &document()).unwrap()
}

async fn sleep_ms(ms: i32) {
    let promise = Promise::new(&mut |resolve, _reject| {
        window()
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

#[wasm_bindgen_test]
fn text_inputs_and_textareas_are_value_fields() {
    for kind in ["text", "search", "email", "url", "tel"] {
        assert_eq!(wrap(input(kind)).shape(), ElementShape::ValueField, "{kind}");
    }
    assert_eq!(wrap(attach("input")).shape(), ElementShape::ValueField);
    assert_eq!(wrap(attach("textarea")).shape(), ElementShape::ValueField);
}

#[wasm_bindgen_test]
fn non_text_inputs_are_other() {
    for kind in ["checkbox", "number", "password", "range"] {
        assert_eq!(wrap(input(kind)).shape(), ElementShape::Other, "{kind}");
    }
}

#[wasm_bindgen_test]
fn editable_div_is_a_region_and_plain_div_is_not() {
    assert_eq!(wrap(editable_div()).shape(), ElementShape::ContentEditable);
    assert_eq!(wrap(attach("div")).shape(), ElementShape::Other);
}

#[wasm_bindgen_test]
fn prototype_setter_gets_past_an_instance_accessor() {
    let el = input("text");

    // what React-style frameworks do: an own `value` accessor that drops writes
    let ctor = Reflect::get(&window(), &JsValue::from_str("HTMLInputElement")).unwrap();
    let proto = Reflect::get(&ctor, &JsValue::from_str("prototype")).unwrap();
    let original =
        Object::get_own_property_descriptor(proto.unchecked_ref(), &JsValue::from_str("value"));
    let getter: Function = Reflect::get(&original, &JsValue::from_str("get"))
        .unwrap()
        .dyn_into()
        .unwrap();
    let accessor = Object::new();
    Reflect::set(&accessor, &JsValue::from_str("get"), &getter).unwrap();
    Reflect::set(
        &accessor,
        &JsValue::from_str("set"),
        &Function::new_with_args("v", ""),
    )
    .unwrap();
    Reflect::set(&accessor, &JsValue::from_str("configurable"), &JsValue::TRUE).unwrap();
    Object::define_property(el.unchecked_ref(), &JsValue::from_str("value"), &accessor);

    let field = wrap(el);
    field.set_content_direct("dropped").unwrap();
    assert_eq!(field.read_content(), "");

    field.set_value_native("hola").unwrap();
    assert_eq!(field.read_content(), "hola");
}

#[wasm_bindgen_test]
fn fields_read_their_value_and_regions_their_text() {
    let el = input("text");
    el.unchecked_ref::<HtmlInputElement>().set_value("typed");
    let field = wrap(el);
    assert_eq!(field.read_content(), "typed");
    assert_eq!(field.read_markup(), "typed");

    let div = editable_div();
    div.set_inner_html("<b>bold</b> text");
    let region = wrap(div);
    assert_eq!(region.read_content(), "bold text");
    assert_eq!(region.read_markup(), "<b>bold</b> text");
}

#[wasm_bindgen_test]
fn region_markup_survives_a_flattening_write() {
    let div = editable_div();
    div.set_inner_html("<p>first</p><p><i>second</i></p>");
    let region = wrap(div);
    let saved = region.read_markup();

    region.set_content_direct("flat").unwrap();
    assert_eq!(region.read_markup(), "flat");

    region.restore_markup(&saved).unwrap();
    assert_eq!(region.read_markup(), "<p>first</p><p><i>second</i></p>");
}

#[wasm_bindgen_test]
async fn ticker_stops_once_the_callback_is_done() {
    let ticks = Rc::new(Cell::new(0));
    let ticker = {
        let ticks = Rc::clone(&ticks);
        Ticker::new(window(), move || {
            ticks.set(ticks.get() + 1);
            ticks.get() < 3
        })
    };

    ticker.start().unwrap();
    ticker.start().unwrap();
    assert!(ticker.is_running());

    sleep_ms(700).await;
    assert_eq!(ticks.get(), 3);
    assert!(!ticker.is_running());

    ticker.start().unwrap();
    assert!(ticker.is_running());
    ticker.stop();
    assert!(!ticker.is_running());
}
