//! Parsed print statements.
//!
//! A print statement lists the candidate base types and the output
//! expressions to evaluate for every base instance. Each output expression
//! is a flat chain of steps read left to right, starting at the base type.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One step of an output expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Step {
    /// Read an attribute of the current type.
    Attribute(String),
    /// Follow a link attribute of the current type to its target record.
    LinkTo(String),
    /// Follow the records of `type_name` whose `attribute` links to the current record.
    LinkFrom {
        /// Type holding the link attribute.
        type_name: String,
        /// Link attribute pointing back at the current type.
        attribute: String,
    },
    /// Follow the classification instances of the current record.
    Classification(String),
    /// Enter the attribute set attached to the current type.
    AttributeSet(String),
    /// The identity of the current record.
    Instance,
    /// The `type.id` string of the current record.
    Oid,
    /// Format the preceding value with a pattern.
    Format(String),
    /// Run a registered program over the preceding value.
    Exec {
        /// Registered program name.
        program: String,
        /// Program parameters.
        params: Vec<String>,
    },
    /// Keep only the first member of a one-to-many value.
    First,
    /// Keep only the last member of a one-to-many value.
    Last,
    /// Concatenate the members of a one-to-many value.
    Join(String),
}

impl Step {
    /// Create an attribute step.
    pub fn attribute(name: impl Into<String>) -> Self {
        Step::Attribute(name.into())
    }

    /// Create a link-to step.
    pub fn link_to(name: impl Into<String>) -> Self {
        Step::LinkTo(name.into())
    }

    /// Create a link-from step.
    pub fn link_from(type_name: impl Into<String>, attribute: impl Into<String>) -> Self {
        Step::LinkFrom {
            type_name: type_name.into(),
            attribute: attribute.into(),
        }
    }

    /// Create a classification step.
    pub fn classification(name: impl Into<String>) -> Self {
        Step::Classification(name.into())
    }

    /// Create an attribute-set step.
    pub fn attribute_set(name: impl Into<String>) -> Self {
        Step::AttributeSet(name.into())
    }

    /// Create a format step.
    pub fn format(pattern: impl Into<String>) -> Self {
        Step::Format(pattern.into())
    }

    /// Create an exec step.
    pub fn exec(program: impl Into<String>, params: Vec<String>) -> Self {
        Step::Exec {
            program: program.into(),
            params,
        }
    }

    /// Create a join step.
    pub fn join(separator: impl Into<String>) -> Self {
        Step::Join(separator.into())
    }

    /// Check if this step is a terminal aggregator.
    pub fn is_aggregator(&self) -> bool {
        matches!(self, Step::First | Step::Last | Step::Join(_))
    }

    /// Check if this step moves to another record.
    pub fn is_traversal(&self) -> bool {
        matches!(
            self,
            Step::LinkTo(_) | Step::LinkFrom { .. } | Step::Classification(_) | Step::AttributeSet(_)
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Attribute(name) => write!(f, "attribute[{}]", name),
            Step::LinkTo(name) => write!(f, "linkto[{}]", name),
            Step::LinkFrom {
                type_name,
                attribute,
            } => write!(f, "linkfrom[{}#{}]", type_name, attribute),
            Step::Classification(name) => write!(f, "class[{}]", name),
            Step::AttributeSet(name) => write!(f, "attributeset[{}]", name),
            Step::Instance => f.write_str("instance"),
            Step::Oid => f.write_str("oid"),
            Step::Format(pattern) => write!(f, "format[{}]", pattern),
            Step::Exec { program, params } => {
                write!(f, "exec[{}", program)?;
                for param in params {
                    write!(f, ",{}", param)?;
                }
                f.write_str("]")
            }
            Step::First => f.write_str("first"),
            Step::Last => f.write_str("last"),
            Step::Join(separator) => write!(f, "join[{}]", separator),
        }
    }
}

/// One requested output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputExpr {
    /// Steps, evaluated left to right from the base type.
    pub steps: Vec<Step>,
    /// Optional alias used to address the output by name.
    pub alias: Option<String>,
}

impl OutputExpr {
    /// Create an output expression from its steps.
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps, alias: None }
    }

    /// Shorthand for a single attribute of the base type.
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::new(vec![Step::attribute(name)])
    }

    /// Append a step.
    pub fn then(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Set the alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// The name this output is addressed by: its alias, or the rendered steps.
    pub fn key(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.to_string(),
        }
    }

    /// Check the expression is structurally sound.
    pub fn validate(&self) -> Result<(), Error> {
        if self.steps.is_empty() {
            return Err(Error::InvalidStatement(
                "output expression has no steps".to_string(),
            ));
        }
        let last = self.steps.len() - 1;
        for (i, step) in self.steps.iter().enumerate() {
            if step.is_aggregator() && i != last {
                return Err(Error::InvalidStatement(format!(
                    "aggregator '{}' must be the last step of '{}'",
                    step, self
                )));
            }
        }
        if matches!(self.steps.first(), Some(Step::Format(_) | Step::Exec { .. })) {
            return Err(Error::InvalidStatement(format!(
                "'{}' transforms a value but nothing precedes it",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for OutputExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

/// How a phrase turns its sub-expression values into text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhraseKind {
    /// Substitute `$<alias>` placeholders in the template.
    Template(String),
    /// Pass the values positionally to the message formatter under this key.
    Message(String),
}

/// A phrase: named text built from several sub-expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseDef {
    /// Alias the phrase is read by.
    pub alias: String,
    /// Template or message key.
    pub kind: PhraseKind,
    /// Sub-expressions, each addressed by its alias.
    pub expressions: Vec<OutputExpr>,
}

impl PhraseDef {
    /// Create a template phrase.
    pub fn template(alias: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            kind: PhraseKind::Template(template.into()),
            expressions: Vec::new(),
        }
    }

    /// Create a message phrase.
    pub fn message(alias: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            kind: PhraseKind::Message(key.into()),
            expressions: Vec::new(),
        }
    }

    /// Add a sub-expression.
    pub fn with_expression(mut self, expression: OutputExpr) -> Self {
        self.expressions.push(expression);
        self
    }
}

/// A parsed print statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintStatement {
    /// Candidate base type names.
    pub types: Vec<String>,
    /// Requested outputs, in request order.
    pub outputs: Vec<OutputExpr>,
    /// Phrases layered on top of the outputs.
    pub phrases: Vec<PhraseDef>,
}

impl PrintStatement {
    /// Create a statement over the given candidate types.
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
            outputs: Vec::new(),
            phrases: Vec::new(),
        }
    }

    /// Create a statement over a single type.
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self::new([type_name.into()])
    }

    /// Add an output.
    pub fn select(mut self, output: OutputExpr) -> Self {
        self.outputs.push(output);
        self
    }

    /// Add a phrase.
    pub fn with_phrase(mut self, phrase: PhraseDef) -> Self {
        self.phrases.push(phrase);
        self
    }

    /// Validate outputs and phrases, and check aliases are unique.
    pub fn validate(&self) -> Result<(), Error> {
        let mut aliases = HashSet::new();
        for output in &self.outputs {
            output.validate()?;
            if let Some(alias) = &output.alias {
                if !aliases.insert(alias.as_str()) {
                    return Err(Error::InvalidStatement(format!(
                        "duplicate alias '{}'",
                        alias
                    )));
                }
            }
        }
        for phrase in &self.phrases {
            if !aliases.insert(phrase.alias.as_str()) {
                return Err(Error::InvalidStatement(format!(
                    "duplicate alias '{}'",
                    phrase.alias
                )));
            }
            let mut inner = HashSet::new();
            for expression in &phrase.expressions {
                expression.validate()?;
                let alias = expression.alias.as_deref().ok_or_else(|| {
                    Error::InvalidStatement(format!(
                        "phrase '{}' expression '{}' needs an alias",
                        phrase.alias, expression
                    ))
                })?;
                if !inner.insert(alias) {
                    return Err(Error::InvalidStatement(format!(
                        "duplicate alias '{}' in phrase '{}'",
                        alias, phrase.alias
                    )));
                }
            }
        }
        Ok(())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}
