use math_core::{LatexError, LatexToMathML, MathCoreConfig, MathDisplay as CoreDisplay};
use mathspan::{MathDisplay, MathSpan, Render};

/// Renders math regions to MathML with `math-core`.
///
/// Equation numbers keep counting across regions until [`MathMLRenderer::reset`].
pub struct MathMLRenderer {
    converter: LatexToMathML,
}

impl MathMLRenderer {
    /// Fails if one of the configured macros cannot be parsed; the error carries the macro
    /// index and definition.
    pub fn new(config: MathCoreConfig) -> Result<Self, (Box<LatexError>, usize, String)> {
        Ok(Self {
            converter: LatexToMathML::new(config)?,
        })
    }

    /// Starts equation numbering from scratch, for the next document.
    pub fn reset(&mut self) {
        self.converter.reset_global_counter();
    }
}

impl Render for MathMLRenderer {
    type Error = Box<LatexError>;

    fn render(&mut self, out: &mut String, span: &MathSpan<'_>) -> Result<(), Self::Error> {
        let display = match span.display {
            MathDisplay::Inline => CoreDisplay::Inline,
            MathDisplay::Block => CoreDisplay::Block,
        };
        let mathml = self
            .converter
            .convert_with_global_counter(span.content(), display)?;
        out.push_str(&mathml);
        Ok(())
    }
}
