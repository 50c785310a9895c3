// End-to-end translation scenarios, driven through an in-memory sink.

use steno_core::chord::Chord;
use steno_core::dict::Dictionary;
use steno_core::output::WriteBuffer;
use steno_core::Engine;

fn build(entries: &[(&str, &str)]) -> Engine {
    let mut dict = Dictionary::new();
    for (path, def) in entries {
        dict.insert(path, def).unwrap();
    }
    Engine::new(dict)
}

fn stroke(engine: &mut Engine, buf: &mut WriteBuffer, text: &str) -> String {
    engine.stroke(Chord::parse(text).unwrap());
    engine.flush(buf).unwrap();
    buf.as_str().to_string()
}

#[test]
fn longest_match_with_undo_chain() {
    let mut engine = build(&[
        ("S", "Batata"),
        ("T", "Tomate"),
        ("S/T/K", "Cebola"),
        ("*", "=undo"),
    ]);
    let mut buf = WriteBuffer::new();

    assert_eq!(stroke(&mut engine, &mut buf, "S"), " Batata");
    assert_eq!(stroke(&mut engine, &mut buf, "T"), " Batata Tomate");
    assert_eq!(stroke(&mut engine, &mut buf, "K"), " Cebola");
    assert_eq!(stroke(&mut engine, &mut buf, "*"), " Batata Tomate");
    assert_eq!(stroke(&mut engine, &mut buf, "*"), " Batata");
    assert_eq!(stroke(&mut engine, &mut buf, "*"), "");
    assert_eq!(stroke(&mut engine, &mut buf, "*"), "");

    assert_eq!(buf.underflows(), 0);
    assert!(engine.translator().is_quiescent());
}

#[test]
fn undo_of_raw_steno() {
    let mut engine = build(&[("*", "=undo")]);
    let mut buf = WriteBuffer::new();

    assert_eq!(stroke(&mut engine, &mut buf, "S"), "S-");
    assert_eq!(stroke(&mut engine, &mut buf, "*"), "");
    assert_eq!(buf.underflows(), 0);
    assert!(engine.translator().is_quiescent());
}

#[test]
fn silent_prefix_then_replacement() {
    let mut engine = build(&[
        ("H", "Cebola"),
        ("K", "Chocolate"),
        ("P", "Pimenta"),
        ("*", "=undo"),
        ("T/P/H", "Tomate"),
    ]);
    let mut buf = WriteBuffer::new();

    assert_eq!(stroke(&mut engine, &mut buf, "T"), "");
    assert_eq!(stroke(&mut engine, &mut buf, "P"), " Pimenta");
    assert_eq!(stroke(&mut engine, &mut buf, "H"), " Tomate");
    assert_eq!(buf.underflows(), 0);
}

#[test]
fn undo_then_restroke_behaves_like_first_time() {
    let mut engine = build(&[
        ("S", "Batata"),
        ("T", "Tomate"),
        ("S/T/K", "Cebola"),
        ("*", "=undo"),
    ]);
    let mut buf = WriteBuffer::new();

    stroke(&mut engine, &mut buf, "S");
    stroke(&mut engine, &mut buf, "T");
    stroke(&mut engine, &mut buf, "K");
    assert_eq!(stroke(&mut engine, &mut buf, "*"), " Batata Tomate");
    // The undone stroke can be made again.
    assert_eq!(stroke(&mut engine, &mut buf, "K"), " Cebola");
    assert_eq!(buf.underflows(), 0);
}

#[test]
fn undo_bottoms_out_quietly() {
    let mut engine = build(&[("*", "=undo")]);
    let mut buf = WriteBuffer::new();

    for _ in 0..4 {
        assert_eq!(stroke(&mut engine, &mut buf, "*"), "");
    }
    assert_eq!(buf.underflows(), 0);
    assert!(engine.translator().is_quiescent());
}

#[test]
fn mixed_session_never_underflows() {
    let mut engine = build(&[
        ("S", "Batata"),
        ("T", "Tomate"),
        ("S/T/K", "Cebola"),
        ("T/P/H", "Tomate"),
        ("P", "Pimenta"),
        ("-G", "{^ing}"),
        ("*", "=undo"),
    ]);
    let mut buf = WriteBuffer::new();

    for text in [
        "S", "T", "K", "*", "T", "P", "H", "-G", "*", "*", "-R", "*", "S", "*", "*", "*",
    ] {
        stroke(&mut engine, &mut buf, text);
        let depths = engine.translator().branch_depths();
        for pair in depths.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }
    assert_eq!(buf.underflows(), 0);
}
