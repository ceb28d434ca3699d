use cmtscope_core::model::util::{MethodQuery, QueryType, params_match};
use cmtscope_core::{ItemKind, JavaItemIndex};

#[test]
fn create_is_idempotent_for_every_kind() {
    let mut index = JavaItemIndex::new();
    let project = index.create_project("app");
    assert_eq!(index.create_project("app"), project);

    let package = index.create_package(project, "com.acme").expect("package");
    assert_eq!(index.create_package(project, "com.acme").expect("package"), package);

    let class = index.create_class(package, "Order").expect("class");
    assert_eq!(index.create_class(package, "Order").expect("class"), class);

    let string = index.create_class(package, "Name").expect("class");
    let method = index
        .create_method(class, "rename", Some(vec![string]))
        .expect("method");
    assert_eq!(
        index
            .create_method(class, "rename", Some(vec![string]))
            .expect("method"),
        method
    );

    let field = index.create_field(class, "id").expect("field");
    assert_eq!(index.create_field(class, "id").expect("field"), field);

    assert_eq!(index.get(class).map(|c| c.children().len()), Some(2));
    assert_eq!(index.find_item(Some(package), "Order", ItemKind::Class), Some(class));
}

#[test]
fn overloads_are_distinct_items() {
    let mut index = JavaItemIndex::new();
    let project = index.create_project("app");
    let package = index.create_package(project, "p").expect("package");
    let class = index.create_class(package, "C").expect("class");
    let int = index.primitive("int").expect("int");
    let long = index.primitive("long").expect("long");

    let a = index.create_method(class, "f", Some(vec![int])).expect("f(int)");
    let b = index.create_method(class, "f", Some(vec![long])).expect("f(long)");
    let c = index.create_method(class, "f", Some(vec![int, int])).expect("f(int,int)");
    assert_ne!(a, b);
    assert_ne!(a, c);
    assert_eq!(index.find_all(Some(class), "f", ItemKind::Method), vec![a, b, c]);
}

#[test]
fn wildcard_position_matches_any_type() {
    let mut index = JavaItemIndex::new();
    let project = index.create_project("app");
    let package = index.create_package(project, "p").expect("package");
    let a = index.create_class(package, "A").expect("A");
    let b = index.create_class(package, "B").expect("B");
    let other = index.create_class(package, "Other").expect("Other");
    let wildcard = index.wildcard();

    assert!(params_match(&index, Some(&[a, wildcard][..]), Some(&[a, b][..])));
    assert!(params_match(&index, Some(&[a, wildcard][..]), Some(&[a, other][..])));
    assert!(!params_match(&index, Some(&[a, wildcard][..]), Some(&[a][..])));
    assert!(!params_match(&index, Some(&[b, wildcard][..]), Some(&[a, b][..])));

    let class = index.create_class(package, "C").expect("C");
    let existing = index
        .create_method(class, "put", Some(vec![a, wildcard]))
        .expect("put");
    assert_eq!(
        index.create_method(class, "put", Some(vec![a, b])).expect("put"),
        existing
    );
}

#[test]
fn missing_and_empty_parameter_lists_are_equal() {
    let mut index = JavaItemIndex::new();
    let project = index.create_project("app");
    let package = index.create_package(project, "p").expect("package");
    let class = index.create_class(package, "C").expect("C");

    assert!(params_match(&index, None, Some(&[][..])));
    assert!(params_match(&index, Some(&[][..]), None));
    assert!(params_match(&index, None, None));

    let run = index.create_method(class, "run", None).expect("run");
    assert_eq!(index.create_method(class, "run", Some(Vec::new())).expect("run"), run);
    assert!(MethodQuery::for_call("run", 0).matches(&index, run));
    assert!(!MethodQuery::for_call("run", 1).matches(&index, run));
}

#[test]
fn arrays_match_by_dimension_and_base() {
    let mut index = JavaItemIndex::new();
    let project = index.create_project("app");
    let package = index.create_package(project, "p").expect("package");
    let a = index.create_class(package, "A").expect("A");
    let wildcard = index.wildcard();
    let a1 = index.create_array_class(a, 1).expect("A[]");
    let a2 = index.create_array_class(a, 2).expect("A[][]");
    let w1 = index.create_array_class(wildcard, 1).expect("?[]");

    assert!(params_match(&index, Some(&[w1][..]), Some(&[a1][..])));
    assert!(!params_match(&index, Some(&[w1][..]), Some(&[a2][..])));
    assert!(!params_match(&index, Some(&[a1][..]), Some(&[a2][..])));

    let sorter = index.create_class(package, "Sorter").expect("Sorter");
    let m = index.create_method(sorter, "sort", Some(vec![a1])).expect("sort");
    let query = MethodQuery::new("sort", vec![QueryType::Known(w1)]);
    assert!(query.matches(&index, m));
}

