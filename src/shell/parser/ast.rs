use std::path::PathBuf;

/// 内建命令种类，在构造命令时根据第一个 token 判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuiltinKind {
    #[default]
    None,
    ChangeDirectory,
    Exit,
}

impl BuiltinKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "cd" => BuiltinKind::ChangeDirectory,
            "exit" => BuiltinKind::Exit,
            _ => BuiltinKind::None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, BuiltinKind::None)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimpleCommand {
    pub tokens: Vec<String>,
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub error: Option<PathBuf>,
    pub builtin: BuiltinKind,
}

impl SimpleCommand {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        let builtin = tokens
            .first()
            .map(|name| BuiltinKind::from_name(name))
            .unwrap_or_default();
        Self {
            tokens,
            builtin,
            ..Default::default()
        }
    }

    pub fn with_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.input = Some(path.into());
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn with_error(mut self, path: impl Into<PathBuf>) -> Self {
        self.error = Some(path.into());
        self
    }

    pub fn program(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }

    pub fn has_redirections(&self) -> bool {
        self.input.is_some() || self.output.is_some() || self.error.is_some()
    }
}

/// 管道树：叶子是单条命令，`Pipe` 把左边的 stdout 接到右边的 stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineNode {
    Leaf(SimpleCommand),
    Pipe(Box<PipelineNode>, Box<PipelineNode>),
}

impl PipelineNode {
    pub fn pipe(left: PipelineNode, right: PipelineNode) -> Self {
        PipelineNode::Pipe(Box::new(left), Box::new(right))
    }

    /// 按从左到右的执行顺序展开所有阶段
    pub fn stages(&self) -> Vec<&SimpleCommand> {
        let mut stages = Vec::new();
        self.collect_stages(&mut stages);
        stages
    }

    fn collect_stages<'a>(&'a self, stages: &mut Vec<&'a SimpleCommand>) {
        match self {
            PipelineNode::Leaf(command) => stages.push(command),
            PipelineNode::Pipe(left, right) => {
                left.collect_stages(stages);
                right.collect_stages(stages);
            }
        }
    }

    pub fn stage_count(&self) -> usize {
        match self {
            PipelineNode::Leaf(_) => 1,
            PipelineNode::Pipe(left, right) => left.stage_count() + right.stage_count(),
        }
    }
}

impl From<SimpleCommand> for PipelineNode {
    fn from(command: SimpleCommand) -> Self {
        PipelineNode::Leaf(command)
    }
}
