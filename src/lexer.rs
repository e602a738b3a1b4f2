//! 谓词文本格式的词法分析器

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    /// 输入字符串中的当前位置（字节索引）
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// 返回当前位置的字符，不推进位置
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// 返回下一个位置的字符，不推进位置
    fn peek_next(&self) -> Option<char> {
        self.input[self.position..].chars().nth(1)
    }

    /// 推进位置一个字符并返回该字符
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    /// 跳过空白字符
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn skip_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn token(&self, kind: TokenKind<'a>, start: usize) -> Token<'a> {
        Token {
            kind,
            span: Span::new(start, self.position),
        }
    }

    /// 读取数字字面量：整数、小数或 yyyy-mm-dd 日期
    ///
    /// `42.city` 中的 `.` 后面不是数字，所以只读取整数 `42`
    fn read_number(&mut self, start: usize) -> Token<'a> {
        self.skip_digits();

        // 四位数字后跟 "-数字" 视为日期
        if self.position - start == 4
            && self.peek() == Some('-')
            && self.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() || c == '-' {
                    self.bump();
                } else {
                    break;
                }
            }
            return self.token(TokenKind::Date(&self.input[start..self.position]), start);
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.bump(); // 消费 '.'
            self.skip_digits();
            let kind = match self.input[start..self.position].parse::<f64>() {
                Ok(value) => TokenKind::Decimal(value),
                Err(_) => TokenKind::Illegal,
            };
            return self.token(kind, start);
        }

        // 超出 i64 范围时视为非法
        let kind = match self.input[start..self.position].parse::<i64>() {
            Ok(value) => TokenKind::Number(value),
            Err(_) => TokenKind::Illegal,
        };
        self.token(kind, start)
    }

    /// 读取双引号包围的字符串字面量
    /// 注意：开始的引号已经被调用者消费
    fn read_string(&mut self, start: usize) -> Token<'a> {
        let content_start = self.position;
        while let Some(c) = self.peek() {
            if c == '"' {
                break;
            }
            self.bump();
        }
        let content_end = self.position;
        if self.bump().is_none() {
            // 缺少结束引号
            return self.token(TokenKind::Illegal, start);
        }

        self.token(TokenKind::String(&self.input[content_start..content_end]), start)
    }

    /// 读取标识符或关键字
    /// 标识符可以包含字母、数字和下划线
    fn read_identifier(&mut self, start: usize) -> Token<'a> {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let literal = &self.input[start..self.position];
        self.token(match_keyword(literal), start)
    }
}

fn match_keyword(s: &str) -> TokenKind {
    match s.to_ascii_lowercase().as_str() {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "in" => TokenKind::In,
        "not_in" => TokenKind::NotIn,
        "any_of" => TokenKind::AnyOf,
        "none_of" => TokenKind::NoneOf,
        "subset_of" => TokenKind::SubsetOf,
        "between" => TokenKind::Between,
        "age_between" => TokenKind::AgeBetween,
        "age_older_than" => TokenKind::AgeOlderThan,
        "age_younger_than" => TokenKind::AgeYoungerThan,
        "in_service_area" => TokenKind::InServiceArea,
        "not_in_service_area" => TokenKind::NotInServiceArea,
        _ => TokenKind::Identifier(s),
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.skip_whitespace();
        let start = self.position;

        let Some(c) = self.bump() else {
            return None; // 到达输入末尾
        };

        let token = match c {
            '=' => {
                // "==" 与 "=" 等价
                if self.peek() == Some('=') {
                    self.bump();
                }
                self.token(TokenKind::Eq, start)
            }
            '(' => self.token(TokenKind::LParen, start),
            ')' => self.token(TokenKind::RParen, start),
            '[' => self.token(TokenKind::LBracket, start),
            ']' => self.token(TokenKind::RBracket, start),
            ',' => self.token(TokenKind::Comma, start),
            '.' => self.token(TokenKind::Dot, start),
            '-' => self.token(TokenKind::Dash, start),
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Lte, start)
                } else {
                    self.token(TokenKind::Lt, start)
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::Gte, start)
                } else {
                    self.token(TokenKind::Gt, start)
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    self.token(TokenKind::NotEq, start)
                } else {
                    self.token(TokenKind::Illegal, start)
                }
            }
            '"' => self.read_string(start),
            c if c.is_ascii_digit() => self.read_number(start),
            c if c.is_alphabetic() => self.read_identifier(start),
            _ => self.token(TokenKind::Illegal, start),
        };
        Some(token)
    }
}
