use unicode_normalization::UnicodeNormalization;

pub trait Preprocessor {
    /// Default OCR cleanup. Line breaks are kept since labels and values
    /// usually sit on the same line.
    fn process(&self, text: &str) -> String {
        let text = text.trim();

        if text.is_empty() {
            return String::new();
        }

        // NFKC folds full-width digits and ligatures OCR engines like to emit
        let text: String = text.nfkc().collect();

        text.lines()
            .map(|line| {
                line.split(|c: char| c.is_whitespace() || c.is_control())
                    .filter(|word| !word.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct DefaultPreprocessor;
impl Preprocessor for DefaultPreprocessor {}
