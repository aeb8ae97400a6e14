//! End-to-end expansion through the public API

use geode::{ExpandError, Expander, expand};
use rstest::rstest;

#[rstest]
#[case("(.upcase)", "{|it|it.upcase}")]
#[case("{len}", "{|it|it.respond_to?(:\"len\") ? it.send(:\"len\") : len(it)}")]
#[case("\\a[1 2 3]", "[1, 2, 3]")]
#[case("\\h{[\"a\",1] [\"b\",2]}", "[[\"a\",1], [\"b\",2]].to_h")]
#[case("(x -> x++)", "{|x|x.succ}")]
#[case("(&:name)", "{|it|it.name}")]
#[case("{memo, x -> memo + x}", "{|it, memo, x|memo + x}")]
#[case("{ it.size > 3 }", "{|it|it.size > 3}")]
#[case("n--", "n.pred")]
fn test_literal_scenarios(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(expand(input).unwrap(), expected);
}

#[test]
fn test_program_keeps_layout() {
    let source = r#"# word lengths
words = \a["apple" "fig" "kiwi"]
lengths = words.map(.size)   # chained
by_name = \h{["one",1] ["two",2]}
puts words.select{ it.size > 3 }.map(&:upcase).inspect
i = 0
i = i++
"#;
    let expected = r#"
words = ["apple", "fig", "kiwi"]
lengths = words.map{|it|it.size}   
by_name = [["one",1], ["two",2]].to_h
puts words.select{|it|it.size > 3}.map{|it|it.upcase}.inspect
i = 0
i = i.succ
"#;
    assert_eq!(expand(source).unwrap(), expected);
}

#[test]
fn test_operators_pass_through() {
    let source = "a ** 2 <=> b << 1 && c != d =~ e !~ f ^= g";
    assert_eq!(expand(source).unwrap(), source);
}

#[test]
fn test_strings_are_opaque() {
    let source = r#"puts "(not a group) {x} \"q\" # not a comment""#;
    assert_eq!(expand(source).unwrap(), source);
}

#[rstest]
#[case("(a", ExpandError::Unterminated { expected: ')', line: 1, column: 1 })]
#[case("x = [1,\n  {2", ExpandError::Unterminated { expected: '}', line: 2, column: 3 })]
#[case("a)", ExpandError::UnexpectedCloser { token: ")".to_string(), line: 1, column: 2 })]
#[case("{a]", ExpandError::UnexpectedCloser { token: "]".to_string(), line: 1, column: 3 })]
#[case("\\a[1 2}", ExpandError::UnexpectedCloser { token: "}".to_string(), line: 1, column: 7 })]
#[case("say \"hi", ExpandError::StrayQuote { line: 1, column: 5 })]
fn test_failures(#[case] input: &str, #[case] expected: ExpandError) {
    assert_eq!(expand(input).unwrap_err(), expected);
}

#[test]
fn test_deep_nesting_is_rejected() {
    let input = format!("{}a{}", "(".repeat(300), ")".repeat(300));
    let err = Expander::new().expand(&input).unwrap_err();
    assert!(matches!(err, ExpandError::NestingTooDeep { limit: 256, .. }));

    let expander = Expander::new().with_max_depth(400);
    assert_eq!(expander.expand(&input).unwrap(), input);
}
