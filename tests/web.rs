//! Browser smoke tests for the JavaScript bindings.
//! Run with `wasm-pack test --headless --firefox`.

#![cfg(target_arch = "wasm32")]

use kittmark::EntityAnnotator;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

const KB: &str = r#"{
    "people": [{ "name": "Brian Eno", "variants": ["Eno"], "info": "Producer." }],
    "places": [{ "name": "CBGB", "info": "Club." }]
}"#;

#[wasm_bindgen_test]
fn version_names_crate() {
    assert!(kittmark::version().starts_with("kittmark v"));
}

#[wasm_bindgen_test]
fn annotates_created_block() {
    let mut annotator = EntityAnnotator::new(JsValue::UNDEFINED).unwrap();
    annotator.hydrate_knowledge_base(KB).unwrap();
    let block = annotator.create_block("Eno played CBGB");
    annotator.pump().unwrap();

    assert_eq!(annotator.block_text(block).as_deref(), Some("Eno played CBGB"));
    assert_eq!(annotator.find_mentions("Brian Eno", None), vec![block]);
    assert_eq!(annotator.block_ids().length(), 1);
}

#[wasm_bindgen_test]
fn unknown_key_is_not_handled() {
    let mut annotator = EntityAnnotator::new(JsValue::NULL).unwrap();
    annotator.hydrate_knowledge_base(KB).unwrap();
    annotator.create_block("plain");
    annotator.pump().unwrap();
    assert!(!annotator.handle_key("a").unwrap());
}

#[wasm_bindgen_test]
fn typing_into_empty_block() {
    let mut annotator = EntityAnnotator::new(JsValue::UNDEFINED).unwrap();
    annotator.hydrate_knowledge_base(KB).unwrap();
    let block = annotator.create_block("");
    annotator.insert_into_block(block, 0, "CBGB").unwrap();
    annotator.pump().unwrap();

    assert_eq!(annotator.block_text(block).as_deref(), Some("CBGB"));
    assert!(annotator.insert_into_block(block, 99, "x").is_err());
}
