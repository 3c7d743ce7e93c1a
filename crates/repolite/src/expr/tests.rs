use super::*;
use crate::column::ColumnDef;
use crate::error::OrmError;
use crate::value::SqlDbType;

static USER_COLUMNS: [ColumnDef; 5] = [
    ColumnDef::new("Id", ValueType::Int32, SqlDbType::Int).primary_key(),
    ColumnDef::new("Name", ValueType::String, SqlDbType::NVarChar),
    ColumnDef::new("Active", ValueType::Bool, SqlDbType::Bit),
    ColumnDef::new("Age", ValueType::Int32, SqlDbType::Int).nullable(true),
    ColumnDef::new("Score", ValueType::Double, SqlDbType::Float),
];

fn user() -> Param {
    Param::new(0, "User", &USER_COLUMNS)
}

fn single() -> XRef {
    XRef::new()
}

fn joined() -> XRef {
    XRef::from([("p0".to_string(), "c0".to_string()), ("p1".to_string(), "c1".to_string())])
}

#[test]
fn test_equality_unqualified() {
    let u = user();
    assert_eq!(translate(&u.col("Id").eq(5), &single()).unwrap(), "([Id] = 5)");
}

#[test]
fn test_equality_qualified_by_alias() {
    let u = user();
    let other = Param::new(1, "User", &USER_COLUMNS);
    let pred = u.col("Id").eq(other.col("Id"));
    assert_eq!(translate(&pred, &joined()).unwrap(), "([c0].[Id] = [c1].[Id])");
}

#[test]
fn test_string_constant_quotes_doubled() {
    let u = user();
    assert_eq!(
        translate(&u.col("Name").eq("O'Brien"), &single()).unwrap(),
        "([Name] = 'O''Brien')"
    );
}

#[test]
fn test_logical_operands() {
    let u = user();
    let pred = u.col("Age").gt(18).and(u.col("Name").ne("x"));
    assert_eq!(
        translate(&pred, &single()).unwrap(),
        "(([Age] > 18) AND ([Name] <> 'x'))"
    );
}

#[test]
fn test_bare_bool_column_expands() {
    let u = user();
    assert_eq!(translate(&u.col("Active"), &single()).unwrap(), "([Active] = 1)");
}

#[test]
fn test_bool_operands_of_logical_ops_render_bare() {
    let u = user();
    assert_eq!(
        translate(&u.col("Active").and(u.col("Id").eq(1)), &single()).unwrap(),
        "([Active] AND ([Id] = 1))"
    );
    assert_eq!(
        translate(&Expr::constant(true).or(u.col("Active")), &single()).unwrap(),
        "('True' OR [Active])"
    );
}

#[test]
fn test_bool_column_in_comparison_renders_bare() {
    let u = user();
    assert_eq!(
        translate(&u.col("Active").eq(true), &single()).unwrap(),
        "([Active] = 'True')"
    );
}

#[test]
fn test_bool_constant_in_unary_mode() {
    assert_eq!(translate(&Expr::constant(true), &single()).unwrap(), "('True' = 1)");
    assert_eq!(
        translate(&!Expr::constant(false), &single()).unwrap(),
        "(NOT ('False' = 1))"
    );
}

#[test]
fn test_not_and_negate() {
    let u = user();
    assert_eq!(translate(&!u.col("Active"), &single()).unwrap(), "(NOT ([Active] = 1))");
    assert_eq!(
        translate(&(-u.col("Score")).lt(0), &single()).unwrap(),
        "((-[Score]) < 0)"
    );
}

#[test]
fn test_arithmetic() {
    let u = user();
    let pred = (u.col("Age") + 1).ge(u.col("Id") * 2);
    assert_eq!(
        translate(&pred, &single()).unwrap(),
        "(([Age] + 1) >= ([Id] * 2))"
    );
}

#[test]
fn test_convert_is_transparent() {
    let u = user();
    assert_eq!(
        translate(&u.col("Age").convert().eq(3), &single()).unwrap(),
        "([Age] = 3)"
    );
}

#[test]
fn test_pattern_calls() {
    let u = user();
    assert_eq!(
        translate(&u.col("Name").contains("ab"), &single()).unwrap(),
        "([Name] LIKE '%ab%')"
    );
    assert_eq!(
        translate(&u.col("Name").starts_with("ab"), &single()).unwrap(),
        "([Name] LIKE 'ab%')"
    );
    assert_eq!(
        translate(&u.col("Name").ends_with("a'b"), &single()).unwrap(),
        "([Name] LIKE '%a''b')"
    );
}

#[test]
fn test_pattern_against_column() {
    let a = user();
    let b = Param::new(1, "User", &USER_COLUMNS);
    assert_eq!(
        translate(&a.col("Name").contains(b.col("Name")), &joined()).unwrap(),
        "([c0].[Name] LIKE '%'+[c1].[Name]+'%')"
    );
}

#[test]
fn test_membership() {
    let u = user();
    assert_eq!(
        translate(&u.col("Name").is_in(vec!["a", "b"]), &single()).unwrap(),
        "([Name] IN ('a', 'b'))"
    );
    assert_eq!(
        translate(&u.col("Id").is_in(Vec::<i32>::new()), &single()).unwrap(),
        "(1=0)"
    );
}

#[test]
fn test_static_membership() {
    let u = user();
    let call = Expr::call(
        methods::CONTAINS,
        vec![Expr::constant(vec![1, 2]), u.col("Id")],
    );
    assert_eq!(translate(&call, &single()).unwrap(), "([Id] IN (1, 2))");
}

#[test]
fn test_membership_over_column_is_rejected() {
    let u = user();
    let call = Expr::call(methods::CONTAINS, vec![u.col("Name"), u.col("Id")]);
    assert!(matches!(
        translate(&call, &single()),
        Err(OrmError::UnsupportedExpression(_))
    ));
}

#[test]
fn test_optional_value_reads_through() {
    let u = user();
    assert_eq!(
        translate(&u.col("Age").value().eq(30), &single()).unwrap(),
        "([Age] = 30)"
    );
}

#[test]
fn test_has_value_renders_empty_string_check() {
    let u = user();
    assert_eq!(translate(&u.col("Age").has_value(), &single()).unwrap(), "([Age] <> '')");
}

#[test]
fn test_unknown_method() {
    let u = user();
    let err = translate(&u.col("Name").method("to_upper", vec![]), &single()).unwrap_err();
    assert_eq!(err, OrmError::UnsupportedExpression("method call `to_upper`".into()));
}

#[test]
fn test_unknown_column() {
    let u = user();
    let err = translate(&u.col("Missing").eq(1), &single()).unwrap_err();
    assert!(matches!(err, OrmError::UnsupportedExpression(m) if m.contains("Missing")));
}

#[test]
fn test_coalesce_unsupported() {
    let u = user();
    assert!(matches!(
        translate(&u.col("Age").coalesce(0).eq(1), &single()),
        Err(OrmError::UnsupportedExpression(_))
    ));
}

#[test]
fn test_list_outside_call_unsupported() {
    let u = user();
    assert!(matches!(
        translate(&u.col("Id").eq(vec![1, 2]), &single()),
        Err(OrmError::UnsupportedExpression(_))
    ));
}

#[test]
fn test_null_constant_unsupported() {
    let u = user();
    assert!(matches!(
        translate(&u.col("Age").eq(Value::Null), &single()),
        Err(OrmError::UnsupportedType(_))
    ));
}

#[test]
fn test_predicate_root_must_be_boolean() {
    let u = user();
    assert!(translate_predicate(&u.col("Age"), &single()).is_err());
    assert!(translate_predicate(&u.col("Active"), &single()).is_ok());
}
