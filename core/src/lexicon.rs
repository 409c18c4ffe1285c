use std::collections::HashMap;
use std::path::Path;

/// Reads the token vocabulary, one token per line. A missing file yields an empty vocabulary.
pub fn load_vocabulary<P: AsRef<Path>>(path: P) -> Vec<String> {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let vocab = parse_vocabulary(&content);
            tracing::info!(path = %path.display(), num_tokens = vocab.len(), "loaded vocabulary");
            vocab
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "vocabulary unavailable");
            Vec::new()
        }
    }
}

pub fn parse_vocabulary(content: &str) -> Vec<String> {
    content.lines().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string).collect()
}

/// Token -> lemma and lemma -> forms, both in file order.
#[derive(Debug, Clone, Default)]
pub struct LemmaMap {
    lemma_of: HashMap<String, String>,
    forms: Vec<(String, Vec<String>)>,
    position: HashMap<String, usize>,
}

impl LemmaMap {
    /// Reads `lemma: form1 form2 ...` lines. A missing file yields an empty map.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let map = Self::parse(&content);
                tracing::info!(path = %path.display(), num_lemmas = map.len(), num_forms = map.lemma_of.len(), "loaded lemmas");
                map
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "lemma map unavailable");
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut map = Self::default();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() { continue; }
            let parts: Vec<&str> = line.split(':').collect();
            let [lemma, forms] = parts.as_slice() else {
                tracing::warn!(line = lineno + 1, "malformed lemma line, skipping");
                continue;
            };
            let lemma = lemma.trim().to_string();
            let forms: Vec<String> = forms.split_whitespace().map(str::to_string).collect();
            map.lemma_of.insert(lemma.clone(), lemma.clone());
            for form in &forms {
                map.lemma_of.insert(form.clone(), lemma.clone());
            }
            match map.position.get(&lemma) {
                Some(&i) => map.forms[i].1 = forms,
                None => {
                    map.position.insert(lemma.clone(), map.forms.len());
                    map.forms.push((lemma, forms));
                }
            }
        }
        map
    }

    pub fn lemma_of(&self, token: &str) -> Option<&str> { self.lemma_of.get(token).map(String::as_str) }

    /// The lemma for `token`, or the token itself when it has none.
    pub fn lemmatize<'a>(&'a self, token: &'a str) -> &'a str { self.lemma_of(token).unwrap_or(token) }

    pub fn forms(&self, lemma: &str) -> Option<&[String]> {
        self.position.get(lemma).map(|&i| self.forms[i].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.forms.iter().map(|(l, f)| (l.as_str(), f.as_slice()))
    }

    pub fn len(&self) -> usize { self.forms.len() }

    pub fn is_empty(&self) -> bool { self.forms.is_empty() }
}
