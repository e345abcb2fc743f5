use std::fmt;

/// One child's argv: the executable followed by its arguments, fixed once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedCommand {
    program: String,
    args: Vec<String>,
}

impl TranslatedCommand {
    pub fn new<S: Into<String>, I: IntoIterator<Item = S>>(program: impl Into<String>, args: I) -> Self {
        Self::builder(program).args(args).build()
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Full argv including `argv[0]`
    pub fn argv(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str))
    }

    pub(crate) fn builder(program: impl Into<String>) -> CommandBuilder {
        CommandBuilder {
            program: program.into(),
            args: Vec::new(),
        }
    }
}

impl fmt::Display for TranslatedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

pub(crate) struct CommandBuilder {
    program: String,
    args: Vec<String>,
}

impl CommandBuilder {
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn arg_if(self, condition: bool, arg: impl Into<String>) -> Self {
        if condition { self.arg(arg) } else { self }
    }

    pub fn args<S: Into<String>, I: IntoIterator<Item = S>>(mut self, iter: I) -> Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> TranslatedCommand {
        TranslatedCommand {
            program: self.program,
            args: self.args,
        }
    }
}
