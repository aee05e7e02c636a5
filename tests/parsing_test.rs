use joinery::prelude::*;

fn index() -> Index {
    let mut index = Index::new(
        Schema::new()
            .with_text("name")
            .with_i64("pid")
            .with_i64("external_id"),
    );
    for (name, pid) in [("ann", "1"), ("bob", "2"), ("anna", "3")] {
        index
            .index_document(&[("name", name), ("pid", pid)].into())
            .unwrap();
    }
    for e in ["1", "2", "3", "3"] {
        index
            .index_document(&[("external_id", e)].into())
            .unwrap();
    }
    index.commit();
    index
}

fn run(snapshot: &Snapshot, text: &str) -> Vec<DocId> {
    let q = QueryParser::new(snapshot.schema()).parse(text).unwrap();
    snapshot
        .search(&q)
        .unwrap()
        .into_iter()
        .map(|(d, _)| d)
        .collect()
}

#[test]
fn test_parsed_joins_run() {
    let snapshot = index().snapshot();
    assert_eq!(run(&snapshot, "{!join from=pid to=external_id}name:ann"), vec![3]);
    assert_eq!(
        run(&snapshot, "{!join from=pid to=external_id}name:an*"),
        vec![3, 5, 6]
    );
    assert_eq!(
        run(&snapshot, "{!join from=pid to=external_id v='name:bob OR name:ann'}"),
        vec![3, 4]
    );
    assert_eq!(
        run(&snapshot, "{!join from=pid to=external_id}NOT name:bob"),
        vec![3, 5, 6]
    );
    // And back again.
    assert_eq!(
        run(
            &snapshot,
            "{!join from=external_id to=pid}{!join from=pid to=external_id}name:bob"
        ),
        vec![1]
    );
    assert!(run(&snapshot, "{!join from=pid to=external_id}name:zed").is_empty());
}

#[test]
fn test_parse_errors() {
    let snapshot = index().snapshot();
    let parser = QueryParser::new(snapshot.schema());

    assert_eq!(
        parser.parse("{!join to=external_id}name:ann"),
        Err(ParseError::MissingParam("from"))
    );
    assert_eq!(
        parser.parse("{!join from=pid}name:ann"),
        Err(ParseError::MissingParam("to"))
    );
    assert_eq!(
        parser.parse("{!join from=pid to=ext}name:ann"),
        Err(ParseError::UnknownField("ext".to_string()))
    );
    assert_eq!(
        parser.parse("{!frange l=1}name:ann"),
        Err(ParseError::UnknownParser("frange".to_string()))
    );
    assert!(matches!(
        parser.parse("{!join from=pid to=external_id"),
        Err(ParseError::Syntax(_))
    ));
    assert!(matches!(
        parser.parse("name:ann AND"),
        Err(ParseError::Syntax(_))
    ));
    assert!(matches!(
        parser.parse("pid:one"),
        Err(ParseError::InvalidValue { .. })
    ));

    // Parse errors convert into execution errors.
    let e: Error = parser.parse("nope:1").unwrap_err().into();
    assert_eq!(e, Error::Parse(ParseError::UnknownField("nope".to_string())));
}

#[test]
fn test_display_parses_back() {
    let snapshot = index().snapshot();
    let parser = QueryParser::new(snapshot.schema());
    for text in [
        "{!join from=pid to=external_id}name:ann",
        "{!join from=pid to=external_id}{!join from=external_id to=pid}name:bob",
    ] {
        let q = parser.parse(text).unwrap();
        assert_eq!(q.to_string(), text);
        assert_eq!(parser.parse(&q.to_string()), Ok(q));
    }
}
