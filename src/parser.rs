//! 谓词文本格式的语法分析器
//!
//! ## 解析流程图
//!
//! ```text
//! parse()
//!   └─ parse_or_expression()
//!        ├─ parse_and_expression()
//!        │    ├─ parse_primary_expression()
//!        │    │    ├─ "(" → 分组表达式 (递归调用parse_or_expression)
//!        │    │    ├─ TRUE / FALSE → 常量
//!        │    │    └─ 数字 → parse_leaf()
//!        │    │         ├─ "." scalar op value → 叶子比较
//!        │    │         └─ IN_SERVICE_AREA / NOT_IN_SERVICE_AREA "id" → 服务区域叶子
//!        │    │
//!        │    └─ 遇到AND时，继续解析右侧基础表达式
//!        │
//!        └─ 遇到OR时，继续解析右侧AND表达式
//! ```
//!
//! ## 语法优先级（从高到低）
//!
//! 1. **括号分组** `(expression)`
//! 2. **叶子比较** `42.city == "Seattle"`, `7 IN_SERVICE_AREA "Seattle"`
//! 3. **AND操作** `expr1 AND expr2`
//! 4. **OR操作** `expr1 OR expr2`
//!
//! 连续的 AND / OR 合并为一个多子节点的节点：`a AND b AND c` 解析为 `AND[a, b, c]`。
//!
//! ## 字面值类型
//! - **字符串**: `"quoted string"`
//! - **整数**: `123`, `-456`
//! - **小数**: `18.5`, `-0.25`
//! - **日期**: `2024-05-20`
//! - **列表**: `["a", "b"]`, `[1, 2, 3]`；`BETWEEN` / `AGE_BETWEEN` 的两元素列表解析为区间
//!
//! ## 解析示例
//!
//! ```text
//! 1.city IN ["Seattle", "Tacoma"] AND 2.date AGE_OLDER_THAN 18
//! (3.number BETWEEN [0, 20] OR 4 IN_SERVICE_AREA "Seattle") AND TRUE
//! ```

use crate::ast::PredicateExpressionNode;
use crate::date::parse_date;
use crate::lexer::Lexer;
use crate::operator::{Operator, Scalar};
use crate::token::{Span, Token, TokenKind};
use crate::value::PredicateValue;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at {}..{}", .span.start, .span.end)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    fn at_position(message: String, span: Span) -> Self {
        Self { message, span }
    }
}

/// 解析前的字面值
#[derive(Debug, Clone, PartialEq)]
enum Literal {
    String(String),
    Long(i64),
    Double(f64),
    Date(NaiveDate),
    List(Vec<Literal>),
}

/// 词法分析并解析一个完整的谓词
pub fn parse_predicate(input: &str) -> Result<PredicateExpressionNode, ParseError> {
    let tokens: Vec<_> = Lexer::new(input).collect();
    Parser::new(&tokens).parse()
}

pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    position: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// 返回当前 token，不推进位置
    fn peek(&self) -> Option<&'a Token<'a>> {
        self.tokens.get(self.position)
    }

    /// 返回当前 token 并推进位置
    fn advance(&mut self) -> Option<&'a Token<'a>> {
        let token = self.tokens.get(self.position)?;
        self.position += 1;
        Some(token)
    }

    /// 输入末尾的位置，用于报告 "意外结束" 错误
    fn eof_span(&self) -> Span {
        let end = self.tokens.last().map_or(0, |t| t.span.end);
        Span::new(end, end)
    }

    fn unexpected_end(&self, expected: &str) -> ParseError {
        ParseError::at_position(
            format!("Expected {}, but reached end of input", expected),
            self.eof_span(),
        )
    }

    /// 期望特定类型的 token 并推进，否则返回错误
    fn expect(&mut self, expected: TokenKind) -> Result<&'a Token<'a>, ParseError> {
        match self.peek() {
            Some(token)
                if std::mem::discriminant(&token.kind) == std::mem::discriminant(&expected) =>
            {
                self.position += 1;
                Ok(token)
            }
            Some(token) => Err(ParseError::at_position(
                format!("Expected {:?}, found {:?}", expected, token.kind),
                token.span,
            )),
            None => Err(self.unexpected_end(&format!("{:?}", expected))),
        }
    }

    /// 检查当前 token 是否匹配给定类型
    fn match_token(&self, kind: &TokenKind) -> bool {
        if let Some(token) = self.peek() {
            std::mem::discriminant(&token.kind) == std::mem::discriminant(kind)
        } else {
            false
        }
    }

    pub fn parse(&mut self) -> Result<PredicateExpressionNode, ParseError> {
        let node = self.parse_or_expression()?;
        if let Some(token) = self.peek() {
            return Err(ParseError::at_position(
                format!("Unexpected token: {:?}", token.kind),
                token.span,
            ));
        }
        Ok(node)
    }

    /// 解析OR表达式 (最低优先级)
    ///
    /// 语法: `and_expr (OR and_expr)*`
    fn parse_or_expression(&mut self) -> Result<PredicateExpressionNode, ParseError> {
        let mut children = vec![self.parse_and_expression()?];

        while self.match_token(&TokenKind::Or) {
            self.advance(); // 消费 OR
            children.push(self.parse_and_expression()?);
        }

        Ok(collapse(children, PredicateExpressionNode::or))
    }

    /// 解析AND表达式
    ///
    /// 语法: `primary (AND primary)*`
    fn parse_and_expression(&mut self) -> Result<PredicateExpressionNode, ParseError> {
        let mut children = vec![self.parse_primary_expression()?];

        while self.match_token(&TokenKind::And) {
            self.advance(); // 消费 AND
            children.push(self.parse_primary_expression()?);
        }

        Ok(collapse(children, PredicateExpressionNode::and))
    }

    /// 解析基础表达式 (最高优先级)
    fn parse_primary_expression(&mut self) -> Result<PredicateExpressionNode, ParseError> {
        let Some(token) = self.advance() else {
            return Err(self.unexpected_end("a predicate"));
        };
        match &token.kind {
            TokenKind::LParen => {
                let expr = self.parse_or_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::True => Ok(PredicateExpressionNode::constant(true)),
            TokenKind::False => Ok(PredicateExpressionNode::constant(false)),
            TokenKind::Number(id) => {
                let question_id = u64::try_from(*id).map_err(|_| {
                    ParseError::at_position(format!("Invalid question id {}", id), token.span)
                })?;
                self.parse_leaf(question_id)
            }
            TokenKind::Illegal => Err(ParseError::at_position(
                "Illegal token".to_string(),
                token.span,
            )),
            other => Err(ParseError::at_position(
                format!("Expected a question id, '(' or TRUE/FALSE, found {:?}", other),
                token.span,
            )),
        }
    }

    /// 解析叶子：问题 id 之后的部分
    fn parse_leaf(&mut self, question_id: u64) -> Result<PredicateExpressionNode, ParseError> {
        let Some(token) = self.advance() else {
            return Err(self.unexpected_end("'.' or a service area operator"));
        };
        match &token.kind {
            TokenKind::Dot => {
                let scalar = self.parse_scalar()?;
                let operator = self.parse_operator()?;
                let value = self.parse_value(operator)?;
                Ok(PredicateExpressionNode::leaf(question_id, scalar, operator, value))
            }
            TokenKind::InServiceArea | TokenKind::NotInServiceArea => {
                let operator = token.kind.operator().unwrap_or(Operator::InServiceArea);
                let id_token = self.expect(TokenKind::String(""))?;
                let TokenKind::String(service_area_id) = id_token.kind else {
                    return Err(ParseError::at_position(
                        "Expected service area id".to_string(),
                        id_token.span,
                    ));
                };
                Ok(PredicateExpressionNode::service_area(
                    question_id,
                    operator,
                    service_area_id,
                ))
            }
            other => Err(ParseError::at_position(
                format!("Expected '.' or a service area operator, found {:?}", other),
                token.span,
            )),
        }
    }

    fn parse_scalar(&mut self) -> Result<Scalar, ParseError> {
        let token = self.expect(TokenKind::Identifier(""))?;
        let TokenKind::Identifier(name) = token.kind else {
            return Err(ParseError::at_position(
                "Expected scalar name".to_string(),
                token.span,
            ));
        };
        Scalar::from_name(name).ok_or_else(|| {
            ParseError::at_position(format!("Unknown scalar '{}'", name), token.span)
        })
    }

    fn parse_operator(&mut self) -> Result<Operator, ParseError> {
        let Some(token) = self.advance() else {
            return Err(self.unexpected_end("an operator"));
        };
        match token.kind.operator() {
            Some(operator) if !operator.is_service_area_operator() => Ok(operator),
            _ => Err(ParseError::at_position(
                format!("Expected comparison operator, found {:?}", token.kind),
                token.span,
            )),
        }
    }

    /// 解析比较值，并根据运算符决定列表的类型
    fn parse_value(&mut self, operator: Operator) -> Result<PredicateValue, ParseError> {
        let start = self.peek().map_or_else(|| self.eof_span(), |t| t.span);
        let literal = self.parse_literal()?;
        let end = self.tokens[..self.position]
            .last()
            .map_or(start, |t| t.span);
        let span = Span::new(start.start, end.end);

        let value = match literal {
            Literal::String(s) => PredicateValue::String(s),
            Literal::Long(n) => PredicateValue::Long(n),
            Literal::Double(n) => PredicateValue::Double(n),
            Literal::Date(d) => PredicateValue::Date(d),
            Literal::List(items) => list_value(operator, items).ok_or_else(|| {
                ParseError::at_position(
                    "List elements must all be strings, whole numbers or dates".to_string(),
                    span,
                )
            })?,
        };
        Ok(value)
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        let Some(token) = self.advance() else {
            return Err(self.unexpected_end("a literal value"));
        };
        match &token.kind {
            TokenKind::String(s) => Ok(Literal::String(s.to_string())),
            TokenKind::Number(n) => Ok(Literal::Long(*n)),
            TokenKind::Decimal(n) => Ok(Literal::Double(*n)),
            TokenKind::Dash => {
                let Some(number) = self.advance() else {
                    return Err(self.unexpected_end("a number"));
                };
                match number.kind {
                    TokenKind::Number(n) => Ok(Literal::Long(-n)),
                    TokenKind::Decimal(n) => Ok(Literal::Double(-n)),
                    ref other => Err(ParseError::at_position(
                        format!("Expected a number after '-', found {:?}", other),
                        number.span,
                    )),
                }
            }
            TokenKind::Date(raw) => parse_date(raw).map(Literal::Date).map_err(|_| {
                ParseError::at_position(format!("Invalid date '{}'", raw), token.span)
            }),
            TokenKind::LBracket => {
                let mut values = Vec::new();

                // 解析逗号分隔的值列表
                if !self.match_token(&TokenKind::RBracket) {
                    loop {
                        let value = self.parse_literal()?;
                        if matches!(value, Literal::List(_)) {
                            return Err(ParseError::at_position(
                                "Lists cannot be nested".to_string(),
                                token.span,
                            ));
                        }
                        values.push(value);
                        if self.match_token(&TokenKind::RBracket) {
                            break;
                        }
                        self.expect(TokenKind::Comma)?;
                    }
                }

                self.expect(TokenKind::RBracket)?;
                Ok(Literal::List(values))
            }
            other => Err(ParseError::at_position(
                format!("Expected literal value, found {:?}", other),
                token.span,
            )),
        }
    }
}

/// 只有一个子节点时不创建 AND / OR 节点
fn collapse(
    mut children: Vec<PredicateExpressionNode>,
    combine: fn(Vec<PredicateExpressionNode>) -> PredicateExpressionNode,
) -> PredicateExpressionNode {
    if children.len() == 1 {
        if let Some(only) = children.pop() {
            return only;
        }
    }
    combine(children)
}

/// 列表字面值到 [`PredicateValue`]；元素类型不一致时返回 None
fn list_value(operator: Operator, items: Vec<Literal>) -> Option<PredicateValue> {
    let is_range = matches!(operator, Operator::Between | Operator::AgeBetween);

    if items.iter().all(|i| matches!(i, Literal::String(_))) {
        let strings = items
            .into_iter()
            .filter_map(|i| match i {
                Literal::String(s) => Some(s),
                _ => None,
            })
            .collect();
        return Some(PredicateValue::ListOfStrings(strings));
    }

    if items.iter().all(|i| matches!(i, Literal::Long(_))) {
        let longs: Vec<i64> = items
            .into_iter()
            .filter_map(|i| match i {
                Literal::Long(n) => Some(n),
                _ => None,
            })
            .collect();
        if is_range && longs.len() == 2 {
            return Some(PredicateValue::PairOfLongs(longs[0], longs[1]));
        }
        return Some(PredicateValue::ListOfLongs(longs));
    }

    match items[..] {
        [Literal::Date(a), Literal::Date(b)] if is_range => Some(PredicateValue::PairOfDates(a, b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn city_is(question_id: u64, city: &str) -> PredicateExpressionNode {
        PredicateExpressionNode::leaf(question_id, Scalar::City, Operator::EqualTo, PredicateValue::string(city))
    }

    #[test]
    fn test_simple_leaf() {
        assert_eq!(parse_predicate(r#"1.city == "Seattle""#).unwrap(), city_is(1, "Seattle"));
        assert_eq!(parse_predicate(r#"1.CITY = "Seattle""#).unwrap(), city_is(1, "Seattle"));
    }

    #[test]
    fn test_precedence() {
        let result = parse_predicate(r#"1.city == "a" AND 1.city == "b" OR 1.city == "c""#).unwrap();
        assert_eq!(
            result,
            PredicateExpressionNode::or(vec![
                PredicateExpressionNode::and(vec![city_is(1, "a"), city_is(1, "b")]),
                city_is(1, "c"),
            ])
        );
    }

    #[test]
    fn test_grouping() {
        let result = parse_predicate(r#"1.city == "a" AND (1.city == "b" OR 1.city == "c")"#).unwrap();
        assert_eq!(
            result,
            PredicateExpressionNode::and(vec![
                city_is(1, "a"),
                PredicateExpressionNode::or(vec![city_is(1, "b"), city_is(1, "c")]),
            ])
        );
    }

    #[test]
    fn test_chained_and_is_flat() {
        let result = parse_predicate(r#"1.city == "a" and 1.city == "b" and 1.city == "c""#).unwrap();
        assert_eq!(
            result,
            PredicateExpressionNode::and(vec![city_is(1, "a"), city_is(1, "b"), city_is(1, "c")])
        );
    }

    #[test]
    fn test_values() {
        let cases = vec![
            ("2.number > -5", Operator::GreaterThan, Scalar::Number, PredicateValue::Long(-5)),
            ("2.date AGE_OLDER_THAN 18.5", Operator::AgeOlderThan, Scalar::Date, PredicateValue::Double(18.5)),
            ("2.date == 2024-05-20", Operator::EqualTo, Scalar::Date, PredicateValue::Date(date(2024, 5, 20))),
            ("2.number IN [1, 2, 3]", Operator::In, Scalar::Number, PredicateValue::ListOfLongs(vec![1, 2, 3])),
            ("2.number BETWEEN [0, 20]", Operator::Between, Scalar::Number, PredicateValue::PairOfLongs(0, 20)),
            ("2.date AGE_BETWEEN [1, 100]", Operator::AgeBetween, Scalar::Date, PredicateValue::PairOfLongs(1, 100)),
            (
                "2.date BETWEEN [2020-05-20, 2024-05-20]",
                Operator::Between,
                Scalar::Date,
                PredicateValue::PairOfDates(date(2020, 5, 20), date(2024, 5, 20)),
            ),
            (
                r#"2.selections ANY_OF ["1", "3"]"#,
                Operator::AnyOf,
                Scalar::Selections,
                PredicateValue::list_of_strings(["1", "3"]),
            ),
        ];
        for (input, operator, scalar, value) in cases {
            assert_eq!(
                parse_predicate(input).unwrap(),
                PredicateExpressionNode::leaf(2, scalar, operator, value),
                "input: {}",
                input
            );
        }
    }

    #[test]
    fn test_service_area_and_constants() {
        assert_eq!(
            parse_predicate(r#"7 NOT_IN_SERVICE_AREA "Seattle" OR TRUE"#).unwrap(),
            PredicateExpressionNode::or(vec![
                PredicateExpressionNode::service_area(7, Operator::NotInServiceArea, "Seattle"),
                PredicateExpressionNode::constant(true),
            ])
        );
        assert_eq!(parse_predicate("false").unwrap(), PredicateExpressionNode::constant(false));
    }

    #[test]
    fn test_display_round_trip() {
        let inputs = [
            r#"1.city == "Seattle" AND 2.number BETWEEN [0, 20] OR (FALSE OR 3 NOT_IN_SERVICE_AREA "Tacoma")"#,
            r#"(1.city IN ["Seattle", "Portland"] OR 2.date AGE_YOUNGER_THAN 3.0) AND 4.currency_cents >= 1050"#,
            "(1.number != -4 AND 1.number < 9) AND 2.date BETWEEN [2020-05-20, 2024-05-20]",
        ];
        for input in inputs {
            let tree = parse_predicate(input).unwrap();
            assert_eq!(tree.to_string(), input);
            assert_eq!(parse_predicate(&tree.to_string()).unwrap(), tree);
        }
    }

    #[test]
    fn test_errors_carry_spans() {
        let err = parse_predicate(r#"1.town == "Seattle""#).unwrap_err();
        assert_eq!(err.message, "Unknown scalar 'town'");
        assert_eq!(err.span, Span::new(2, 6));

        let err = parse_predicate(r#"1.city == "Seattle" AND"#).unwrap_err();
        assert_eq!(err.span, Span::new(23, 23));

        let err = parse_predicate(r#"1.city == "Seattle")"#).unwrap_err();
        assert_eq!(err.span, Span::new(19, 20));

        let err = parse_predicate(r#"1.city IN_SERVICE_AREA "Seattle""#).unwrap_err();
        assert_eq!(err.span, Span::new(7, 22));
    }

    #[test]
    fn test_list_errors() {
        assert!(parse_predicate(r#"1.city IN ["a", 2]"#).is_err());
        assert!(parse_predicate(r#"1.city IN ["a",]"#).is_err());
        assert!(parse_predicate(r#"1.city IN [["a"]]"#).is_err());
        assert!(parse_predicate("2.date == 2024-13-40").is_err());
        assert!(parse_predicate("1.city == \"unterminated").is_err());
    }
}
