use thiserror::Error;

use super::ast::{PipelineNode, SimpleCommand};
use super::lexer::{Lexer, RedirectOp, Token};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected command name")]
    ExpectedCommand,
    #[error("expected filename after `{0}`")]
    ExpectedFilename(&'static str),
    #[error("unsupported operator `{0}`")]
    UnsupportedOperator(String),
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
        }
    }

    /// 解析一整行，空行返回 `None`
    pub fn parse_line(input: &'a str) -> Result<Option<PipelineNode>, ParseError> {
        let mut parser = Parser::new(input);
        if parser.current_token == Token::EOF {
            return Ok(None);
        }
        let node = parser.parse_pipeline()?;
        match &parser.current_token {
            Token::EOF => Ok(Some(node)),
            Token::Unsupported(op) => Err(ParseError::UnsupportedOperator(op.clone())),
            _ => Err(ParseError::ExpectedCommand),
        }
    }

    fn next_token(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    // pipeline := command ('|' pipeline)?
    fn parse_pipeline(&mut self) -> Result<PipelineNode, ParseError> {
        let left = PipelineNode::Leaf(self.parse_simple_command()?);

        if self.current_token == Token::Pipe {
            self.next_token();
            let right = self.parse_pipeline()?;
            return Ok(PipelineNode::pipe(left, right));
        }

        Ok(left)
    }

    fn parse_simple_command(&mut self) -> Result<SimpleCommand, ParseError> {
        let mut tokens = Vec::new();
        let mut redirections = Vec::new();

        // 解析命令名
        match &self.current_token {
            Token::Word(word) => {
                tokens.push(word.clone());
                self.next_token();
            }
            Token::Unsupported(op) => return Err(ParseError::UnsupportedOperator(op.clone())),
            _ => return Err(ParseError::ExpectedCommand),
        }

        // 解析参数和重定向
        loop {
            match &self.current_token {
                Token::EOF | Token::Pipe => break,
                Token::Unsupported(op) => {
                    return Err(ParseError::UnsupportedOperator(op.clone()))
                }
                Token::Redirect(op) => {
                    let op = *op;
                    let filename = self.parse_redirection(op)?;
                    redirections.push((op, filename));
                }
                Token::Word(word) => {
                    tokens.push(word.clone());
                    self.next_token();
                }
            }
        }

        // 同一个流重复重定向时以最后一个为准
        let mut command = SimpleCommand::new(tokens);
        for (op, filename) in redirections {
            command = match op {
                RedirectOp::Input => command.with_input(filename),
                RedirectOp::Output => command.with_output(filename),
                RedirectOp::Error => command.with_error(filename),
            };
        }
        Ok(command)
    }

    fn parse_redirection(&mut self, operator: RedirectOp) -> Result<String, ParseError> {
        self.next_token(); // 跳过重定向操作符

        match &self.current_token {
            Token::Word(filename) => {
                let filename = filename.clone();
                self.next_token();
                Ok(filename)
            }
            _ => Err(ParseError::ExpectedFilename(match operator {
                RedirectOp::Input => "<",
                RedirectOp::Output => ">",
                RedirectOp::Error => "2>",
            })),
        }
    }
}
