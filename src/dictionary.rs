//! Vocabulary, n-gram features and subsampling statistics for a corpus.
//!
//! The dictionary is built by one pass over the training file and is
//! read-only afterwards; training threads share it and call `get_line` to turn
//! lines of text into training examples.
//!
//! Input-matrix rows: word `w` is row `w`, feature `f` is row `nwords + f`.
//! Every feature list handed out by the dictionary already holds row indices.

use std::collections::HashMap;
use std::io::{self, BufRead, ErrorKind, Seek, SeekFrom};

use anyhow::{Context, Result};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::alphabet::Alphabet;
use crate::args::{Args, ModelKind};
use crate::error::TrainError;
use crate::real;
use crate::utf8;

/// End-of-sentence token, produced for every newline.
pub const EOS: &str = "</s>";
/// Begin-of-word marker for n-gram extraction.
pub const BOW: &str = "<";
/// End-of-word marker for n-gram extraction.
pub const EOW: &str = ">";

/// Hard cap on the size of the word table while reading the corpus.
pub const MAX_VOCAB_SIZE: usize = 30_000_000;

/// Tokens of one line that `get_line` looks at.
pub const MAX_LINE_SIZE: u64 = 1024;

fn is_separator(c: u8) -> bool {
    matches!(c, b' ' | b'\n' | b'\r' | b'\t' | b'\x0b' | b'\x0c' | b'\0')
}

/// Reads a single token into `word`.
///
/// A newline with no token in front of it reads as `</s>`. A newline that
/// ends a token stays in the stream, so the following call returns `</s>`.
/// Returns `Ok(false)` at end of input.
pub fn read_word<R: BufRead>(input: &mut R, word: &mut Vec<u8>) -> io::Result<bool> {
    word.clear();
    loop {
        let buf = match input.fill_buf() {
            Ok(buf) => buf,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        if buf.is_empty() {
            return Ok(!word.is_empty());
        }

        let mut consumed = 0;
        let mut done = false;
        for &c in buf {
            if is_separator(c) {
                if word.is_empty() {
                    consumed += 1;
                    if c == b'\n' {
                        word.extend_from_slice(EOS.as_bytes());
                        done = true;
                        break;
                    }
                    continue;
                }
                if c != b'\n' {
                    consumed += 1;
                }
                done = true;
                break;
            }
            word.push(c);
            consumed += 1;
        }
        input.consume(consumed);
        if done {
            return Ok(true);
        }
    }
}

#[derive(Clone, Debug)]
pub struct WordProps {
    pub word: String,
    pub count: u64,
    /// Input rows of the word's n-gram features; empty for whole-word models.
    pub features: Vec<usize>,
}

/// Training examples read from one line of text.
///
/// `sources[k]` holds the input rows for the `k`th kept token and
/// `targets[k]` its output row.
#[derive(Default)]
pub struct Line {
    pub sources: Vec<Vec<usize>>,
    pub targets: Vec<usize>,
    token: Vec<u8>,
}

impl Line {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn clear(&mut self) {
        self.sources.clear();
        self.targets.clear();
    }
}

pub struct Dictionary {
    kind: ModelKind,
    minn: usize,
    maxn: usize,
    min_count: u64,
    t: real,
    max_vocab_size: usize,

    words: Alphabet,
    /// Same strings, order and counts as `words`; indexes the output matrix.
    targets: Alphabet,
    features: Alphabet,
    /// Character to stroke codes, for substoke.
    feature_map: HashMap<String, String>,

    word_props: Vec<WordProps>,
    discard: Vec<real>,
    ntokens: u64,
}

impl Dictionary {
    pub fn new(args: &Args) -> Self {
        Self::with_max_vocab_size(args, MAX_VOCAB_SIZE)
    }

    /// Panics if `max_vocab_size` is zero.
    pub fn with_max_vocab_size(args: &Args, max_vocab_size: usize) -> Self {
        assert!(max_vocab_size > 0, "vocabulary cap must be positive");
        let capacity = max_vocab_size - 1;
        Dictionary {
            kind: args.model,
            minn: args.minn,
            maxn: args.maxn,
            min_count: args.min_count,
            t: args.t,
            max_vocab_size,
            words: Alphabet::with_capacity(capacity),
            targets: Alphabet::with_capacity(capacity),
            features: Alphabet::with_capacity(capacity),
            feature_map: HashMap::new(),
            word_props: Vec::new(),
            discard: Vec::new(),
            ntokens: 0,
        }
    }

    /// Build the dictionary from a corpus.
    pub fn ingest<R: BufRead>(&mut self, input: R) -> Result<()> {
        self.count_words(input)?;
        self.finish()
    }

    /// Build the dictionary from a corpus and a `word<space>codes` feature
    /// file, for the substoke model.
    pub fn ingest_with_features<R: BufRead, F: BufRead>(
        &mut self,
        input: R,
        feature_file: F,
    ) -> Result<()> {
        self.count_words(input)?;
        self.read_feature_map(feature_file)?;
        self.finish()
    }

    fn count_words<R: BufRead>(&mut self, mut input: R) -> Result<()> {
        let mut buf = Vec::new();
        let mut min_threshold = 1;
        self.ntokens = 0;
        while read_word(&mut input, &mut buf).context("error reading training data")? {
            let token = String::from_utf8_lossy(&buf);
            self.words.insert(&token, 1);
            self.ntokens += 1;
            if self.ntokens % 1_000_000 == 0 {
                debug!("read {}M words", self.ntokens / 1_000_000);
            }
            if self.words.len() as f64 > 0.75 * self.max_vocab_size as f64 {
                min_threshold += 1;
                self.words.prune(min_threshold);
            }
        }
        Ok(())
    }

    fn read_feature_map<F: BufRead>(&mut self, input: F) -> Result<()> {
        self.feature_map.clear();
        for line in input.lines() {
            let line = line.context("error reading feature file")?;
            match line.split_once(' ') {
                Some((word, codes)) => {
                    self.feature_map.insert(word.to_string(), codes.to_string());
                }
                None => warn!("skipping feature line without a separator: {line:?}"),
            }
        }
        info!(size = self.feature_map.len(), "loaded feature map");
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let words_seen = self.words.len();
        self.words.prune(self.min_count);
        if self.words.is_empty() {
            return Err(TrainError::EmptyVocabulary.into());
        }

        self.init_features();
        self.init_targets();
        self.init_word_props();
        self.init_discard();

        info!(
            tokens = self.ntokens,
            words_seen,
            words = self.nwords(),
            features = self.nfeatures(),
            targets = self.ntargets(),
            "dictionary ready"
        );
        Ok(())
    }

    /// The string n-gram extraction runs over: the word in boundary markers,
    /// or for substoke its stroke codes in boundary markers.
    fn marked_up(&self, word: &str) -> String {
        match self.kind {
            ModelKind::Substoke => format!("{BOW}{}{EOW}", self.strokes(word)),
            _ => format!("{BOW}{word}{EOW}"),
        }
    }

    /// Translate each character of `word` through the feature map. Unmapped
    /// characters contribute nothing; spaces are dropped.
    fn strokes(&self, word: &str) -> String {
        let mut codes: String = utf8::characters(word)
            .filter_map(|c| self.feature_map.get(c))
            .map(String::as_str)
            .collect();
        codes.retain(|c| c != ' ');
        codes
    }

    fn for_each_ngram(&self, marked: &str, emit: impl FnMut(&str)) {
        match self.kind {
            ModelKind::Substoke => self.for_each_stroke_ngram(marked, emit),
            _ => self.for_each_subword(marked, emit),
        }
    }

    /// Character n-grams of `word` with lengths in `minn..=maxn`, skipping
    /// the lone boundary markers. Works on bytes and never splits a
    /// multi-byte character.
    fn for_each_subword(&self, word: &str, mut emit: impl FnMut(&str)) {
        let bytes = word.as_bytes();
        for i in 0..bytes.len() {
            if utf8::is_continuation(bytes[i]) {
                continue;
            }
            let mut j = i;
            let mut n = 1;
            while j < bytes.len() && n <= self.maxn {
                j += 1;
                while j < bytes.len() && utf8::is_continuation(bytes[j]) {
                    j += 1;
                }
                if n >= self.minn && !(n == 1 && (i == 0 || j == bytes.len())) {
                    emit(&word[i..j]);
                }
                n += 1;
            }
        }
    }

    /// Every window of `minn..=maxn` consecutive characters.
    fn for_each_stroke_ngram(&self, codes: &str, mut emit: impl FnMut(&str)) {
        let offsets: Vec<usize> = codes
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(codes.len()))
            .collect();
        let len = offsets.len() - 1;
        for i in 0..len {
            for n in self.minn..=self.maxn {
                if i + n > len {
                    continue;
                }
                emit(&codes[offsets[i]..offsets[i + n]]);
            }
        }
    }

    /// The feature strings of `word`, in extraction order. Empty for
    /// whole-word models and for `</s>`.
    pub fn ngrams(&self, word: &str) -> Vec<String> {
        let mut ngrams = vec![];
        if self.kind.uses_features() && word != EOS {
            self.for_each_ngram(&self.marked_up(word), |g| ngrams.push(g.to_string()));
        }
        ngrams
    }

    fn init_features(&mut self) {
        if !self.kind.uses_features() {
            return;
        }
        info!("building features");
        for id in 0..self.words.len() {
            let count = self.words.count(id);
            let ngrams = self.ngrams(self.words.word(id));
            for ngram in ngrams {
                self.features.insert(&ngram, count);
            }
        }
    }

    fn init_targets(&mut self) {
        for (word, count) in self.words.iter() {
            self.targets.insert(word, count);
        }
    }

    fn init_word_props(&mut self) {
        let nwords = self.words.len();
        self.word_props = (0..nwords)
            .map(|id| {
                let word = self.words.word(id).to_string();
                let mut features = vec![];
                if self.kind.uses_features() && word != EOS {
                    self.for_each_ngram(&self.marked_up(&word), |g| {
                        if let Some(f) = self.features.lookup(g) {
                            features.push(nwords + f);
                        }
                    });
                }
                WordProps {
                    word,
                    count: self.words.count(id),
                    features,
                }
            })
            .collect();
    }

    fn init_discard(&mut self) {
        let ntokens = self.ntokens as real;
        let t = self.t;
        self.discard = self
            .words
            .iter()
            .map(|(_, count)| {
                let f = count as real / ntokens;
                (t / f).sqrt() + t / f
            })
            .collect();
    }

    /// True if a token of word `id` should be skipped, given a uniform draw
    /// in `0.0..1.0`.
    pub fn discard(&self, id: usize, draw: real) -> bool {
        draw > self.discard[id]
    }

    /// Probability of keeping a token of word `id`; may exceed 1.
    pub fn keep_probability(&self, id: usize) -> real {
        self.discard[id]
    }

    /// Reads the next line of `input` into `line`.
    ///
    /// Rewinds to the start of the input first if it is exhausted. Unknown
    /// words and subsampled words produce no example. Returns the number of
    /// tokens read, including skipped ones and the terminating `</s>`.
    pub fn get_line<R, G>(&self, input: &mut R, line: &mut Line, rng: &mut G) -> Result<u64>
    where
        R: BufRead + Seek,
        G: Rng,
    {
        if input.fill_buf().context("error reading training data")?.is_empty() {
            input
                .seek(SeekFrom::Start(0))
                .context("error rewinding training data")?;
        }

        line.clear();
        let mut ntokens = 0;
        while read_word(input, &mut line.token).context("error reading training data")? {
            if line.token == EOS.as_bytes() {
                ntokens += 1;
                break;
            }
            if ntokens >= MAX_LINE_SIZE {
                continue;
            }
            ntokens += 1;

            let token = String::from_utf8_lossy(&line.token);
            let (Some(wid), Some(tid)) = (self.words.lookup(&token), self.targets.lookup(&token))
            else {
                continue;
            };
            if self.discard(wid, rng.gen::<real>()) {
                continue;
            }
            let sources = if self.kind.uses_features() {
                self.word_props[wid].features.clone()
            } else {
                vec![wid]
            };
            line.sources.push(sources);
            line.targets.push(tid);
        }
        Ok(ntokens)
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn nwords(&self) -> usize {
        self.words.len()
    }

    pub fn ntargets(&self) -> usize {
        self.targets.len()
    }

    pub fn nfeatures(&self) -> usize {
        self.features.len()
    }

    /// Tokens in the corpus, counting every `</s>`.
    pub fn ntokens(&self) -> u64 {
        self.ntokens
    }

    pub fn word_id(&self, word: &str) -> Option<usize> {
        self.words.lookup(word)
    }

    pub fn target_id(&self, word: &str) -> Option<usize> {
        self.targets.lookup(word)
    }

    /// Id of a feature string in the feature table (not its input row).
    pub fn feature_id(&self, feature: &str) -> Option<usize> {
        self.features.lookup(feature)
    }

    pub fn word(&self, id: usize) -> &str {
        self.words.word(id)
    }

    pub fn target(&self, id: usize) -> &str {
        self.targets.word(id)
    }

    pub fn feature(&self, id: usize) -> &str {
        self.features.word(id)
    }

    pub fn word_props(&self) -> &[WordProps] {
        &self.word_props
    }

    /// Input rows of the features of word `id`.
    pub fn word_features(&self, id: usize) -> &[usize] {
        &self.word_props[id].features
    }

    /// Word counts in id order.
    pub fn counts(&self) -> Vec<u64> {
        self.word_props.iter().map(|wp| wp.count).collect()
    }

    /// Words and their counts, in id order.
    pub fn words(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.words.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_log::test;

    use super::*;

    fn args(model: ModelKind) -> Args {
        Args {
            model,
            min_count: 1,
            t: 1.0,
            ..Args::default()
        }
    }

    fn dictionary(args: &Args, corpus: &str) -> Dictionary {
        let mut dict = Dictionary::new(args);
        dict.ingest(Cursor::new(corpus)).unwrap();
        dict
    }

    fn read_all(input: &str) -> Vec<String> {
        let mut input = Cursor::new(input);
        let mut buf = vec![];
        let mut words = vec![];
        while read_word(&mut input, &mut buf).unwrap() {
            words.push(String::from_utf8(buf.clone()).unwrap());
        }
        words
    }

    #[test]
    fn tokenizer() {
        assert_eq!(read_all("a b\n\nc"), vec!["a", "b", "</s>", "</s>", "c"]);
        assert_eq!(read_all("  x\t\ty\r\nz \n"), vec!["x", "y", "</s>", "z", "</s>"]);
        assert_eq!(read_all(""), Vec::<String>::new());
        assert_eq!(read_all("中文 字\n"), vec!["中文", "字", "</s>"]);
    }

    #[test]
    fn tokenizer_across_buffer_boundaries() {
        let text = "alpha beta\ngamma\n";
        let mut input = io::BufReader::with_capacity(3, Cursor::new(text));
        let mut buf = vec![];
        let mut words = vec![];
        while read_word(&mut input, &mut buf).unwrap() {
            words.push(String::from_utf8(buf.clone()).unwrap());
        }
        assert_eq!(words, vec!["alpha", "beta", "</s>", "gamma", "</s>"]);
    }

    #[test]
    fn small_corpus_vocabulary() {
        let dict = dictionary(&args(ModelKind::Skipgram), "a b a c a b\n");
        let words: Vec<(&str, u64)> = dict.words().collect();
        assert_eq!(words, vec![("a", 3), ("b", 2), ("c", 1), ("</s>", 1)]);
        assert_eq!(dict.ntokens(), 7);
        assert_eq!(dict.ntargets(), 4);
        for (id, (word, _)) in words.iter().enumerate() {
            assert_eq!(dict.target_id(word), Some(id));
            assert_eq!(dict.target(id), *word);
        }
        assert_eq!(dict.nfeatures(), 0);
        assert!(dict.word_features(0).is_empty());
        assert_eq!(dict.counts(), vec![3, 2, 1, 1]);
    }

    #[test]
    fn min_count_prunes_rare_words() {
        let args = Args {
            min_count: 2,
            ..args(ModelKind::Skipgram)
        };
        let dict = dictionary(&args, "b a c a b a\n");
        let words: Vec<(&str, u64)> = dict.words().collect();
        assert_eq!(words, vec![("a", 3), ("b", 2)]);
        assert_eq!(dict.word_id("c"), None);
        assert_eq!(dict.ntokens(), 7);
    }

    #[test]
    fn empty_vocabulary_is_an_error() {
        let args = Args {
            min_count: 5,
            ..args(ModelKind::Skipgram)
        };
        let mut dict = Dictionary::new(&args);
        let err = dict.ingest(Cursor::new("a b c\n")).unwrap_err();
        assert!(matches!(err.downcast_ref::<TrainError>(), Some(TrainError::EmptyVocabulary)));

        let mut dict = Dictionary::new(&args);
        assert!(dict.ingest(Cursor::new("")).is_err());
    }

    #[test]
    fn vocabulary_stays_bounded_while_reading() {
        let mut corpus = String::new();
        for i in 0..20 {
            corpus.push_str(&format!("common w{i} "));
        }
        let mut dict = Dictionary::with_max_vocab_size(&args(ModelKind::Skipgram), 8);
        dict.ingest(Cursor::new(corpus)).unwrap();
        assert!(dict.nwords() <= 7);
        assert_eq!(dict.word_id("common"), Some(0));
        assert_eq!(dict.counts()[0], 20);
        assert_eq!(dict.ntokens(), 40);
    }

    #[test]
    #[should_panic(expected = "vocabulary cap must be positive")]
    fn zero_vocabulary_cap() {
        Dictionary::with_max_vocab_size(&args(ModelKind::Skipgram), 0);
    }

    #[test]
    fn subwords() {
        let args = Args {
            minn: 3,
            maxn: 3,
            ..args(ModelKind::Subword)
        };
        let dict = dictionary(&args, "where\n");
        assert_eq!(dict.ngrams("where"), vec!["<wh", "whe", "her", "ere", "re>"]);

        let args = Args {
            minn: 1,
            maxn: 1,
            ..args
        };
        let dict = dictionary(&args, "where\n");
        assert_eq!(dict.ngrams("where"), vec!["w", "h", "e", "r", "e"]);

        let args = Args {
            minn: 2,
            maxn: 2,
            ..args
        };
        let dict = dictionary(&args, "中文\n");
        assert_eq!(dict.ngrams("中文"), vec!["<中", "中文", "文>"]);
        assert!(dict.ngrams(EOS).is_empty());
    }

    #[test]
    fn subwords_are_deterministic_and_bounded() {
        let args = Args {
            minn: 2,
            maxn: 4,
            ..args(ModelKind::Subword)
        };
        let dict = dictionary(&args, "x\n");
        for word in ["a", "ab", "embedding", "naïve", "日本語の単語", "🦀rust"] {
            let ngrams = dict.ngrams(word);
            assert!(!ngrams.is_empty(), "no n-grams for {word}");
            for ngram in &ngrams {
                let n = ngram.chars().count();
                assert!((2..=4).contains(&n), "{ngram:?} from {word:?}");
            }
            assert_eq!(dict.ngrams(word), ngrams);
        }
    }

    #[test]
    fn subword_features_are_input_rows() {
        let args = Args {
            minn: 3,
            maxn: 4,
            ..args(ModelKind::Subword)
        };
        let dict = dictionary(&args, "cat cats\n");
        let nwords = dict.nwords();
        assert_eq!(nwords, 3);
        for id in 0..nwords {
            let word = dict.word(id);
            let rows = dict.word_features(id);
            let names: Vec<String> = rows
                .iter()
                .map(|&row| dict.feature(row - nwords).to_string())
                .collect();
            assert_eq!(names, dict.ngrams(word));
            assert!(rows.iter().all(|&row| row >= nwords && row < nwords + dict.nfeatures()));
        }
        // "<ca" and "cat" are shared by both words.
        let cat = dict.word_id("cat").unwrap();
        let cats = dict.word_id("cats").unwrap();
        assert_eq!(dict.word_features(cat)[0], dict.word_features(cats)[0]);
        assert!(dict.word_features(dict.word_id(EOS).unwrap()).is_empty());

        let props = dict.word_props();
        assert_eq!(props.len(), nwords);
        assert_eq!((props[cat].word.as_str(), props[cat].count), ("cat", 1));
        assert_eq!(props[cats].features, dict.word_features(cats));
    }

    #[test]
    fn stroke_features() {
        let args = Args {
            minn: 3,
            maxn: 3,
            ..args(ModelKind::Substoke)
        };
        let feature_file = "中 12\n文 3 4 5\nbroken-line\n";
        let mut dict = Dictionary::new(&args);
        dict.ingest_with_features(Cursor::new("中文 x中\n"), Cursor::new(feature_file))
            .unwrap();

        assert_eq!(dict.ngrams("中文"), vec!["<12", "123", "234", "345", "45>"]);
        // Unmapped characters contribute nothing.
        assert_eq!(dict.ngrams("x中"), vec!["<12", "12>"]);

        let nwords = dict.nwords();
        let id = dict.word_id("中文").unwrap();
        let names: Vec<&str> = dict
            .word_features(id)
            .iter()
            .map(|&row| dict.feature(row - nwords))
            .collect();
        assert_eq!(names, vec!["<12", "123", "234", "345", "45>"]);
        assert_eq!(dict.feature_id("<12").map(|f| f < dict.nfeatures()), Some(true));
    }

    #[test]
    fn get_line_builds_examples_and_wraps_around() {
        let corpus = "a b a c a b\nx a\n";
        let dict = dictionary(&args(ModelKind::Skipgram), corpus);
        let (a, b, c) = (
            dict.word_id("a").unwrap(),
            dict.word_id("b").unwrap(),
            dict.word_id("c").unwrap(),
        );
        let mut input = Cursor::new(corpus);
        let mut line = Line::default();
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(dict.get_line(&mut input, &mut line, &mut rng).unwrap(), 7);
        assert_eq!(line.targets, vec![a, b, a, c, a, b]);
        assert_eq!(line.sources, vec![vec![a], vec![b], vec![a], vec![c], vec![a], vec![b]]);

        assert_eq!(dict.get_line(&mut input, &mut line, &mut rng).unwrap(), 3);
        assert_eq!(line.targets, vec![dict.word_id("x").unwrap(), a]);

        // End of input: start over.
        assert_eq!(dict.get_line(&mut input, &mut line, &mut rng).unwrap(), 7);
        assert_eq!(line.len(), 6);
    }

    #[test]
    fn get_line_skips_unknown_words_and_uses_features() {
        let args = Args {
            min_count: 2,
            minn: 3,
            maxn: 3,
            ..args(ModelKind::Subword)
        };
        let corpus = "dog cat dog\ncat bird\n";
        let dict = dictionary(&args, corpus);
        let mut input = Cursor::new(corpus);
        let mut line = Line::default();
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(dict.get_line(&mut input, &mut line, &mut rng).unwrap(), 4);
        let dog = dict.word_id("dog").unwrap();
        assert_eq!(line.sources[0], dict.word_features(dog));
        assert!(!line.sources[0].contains(&dog));

        assert_eq!(dict.get_line(&mut input, &mut line, &mut rng).unwrap(), 3);
        assert_eq!(line.targets, vec![dict.target_id("cat").unwrap()]);
    }

    #[test]
    fn long_lines_are_capped() {
        let corpus = format!("{}\n", vec!["w"; 1500].join(" "));
        let dict = dictionary(&args(ModelKind::Skipgram), &corpus);
        let mut input = Cursor::new(corpus);
        let mut line = Line::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(dict.get_line(&mut input, &mut line, &mut rng).unwrap(), MAX_LINE_SIZE + 1);
        assert_eq!(line.len(), MAX_LINE_SIZE as usize);
    }

    #[test]
    fn frequent_words_are_discarded_more() {
        let args = Args {
            t: 1e-2,
            ..args(ModelKind::Skipgram)
        };
        let mut corpus = String::new();
        for i in 0..200 {
            corpus.push_str("the ");
            if i % 2 == 0 {
                corpus.push_str("of ");
            }
            if i % 10 == 0 {
                corpus.push_str("cat ");
            }
        }
        corpus.push_str("zebra\n");
        let dict = dictionary(&args, &corpus);

        let mut by_count: Vec<(u64, real)> = (0..dict.nwords())
            .map(|id| (dict.counts()[id], dict.keep_probability(id)))
            .collect();
        by_count.sort_by_key(|&(count, _)| count);
        for pair in by_count.windows(2) {
            assert!(pair[0].1 >= pair[1].1, "{pair:?}");
        }

        let zebra = dict.word_id("zebra").unwrap();
        assert!(dict.keep_probability(zebra) > 1.0);
        assert!(!dict.discard(zebra, 0.999));
        let the = dict.word_id("the").unwrap();
        assert!(dict.keep_probability(the) < 1.0);
        assert!(dict.discard(the, 0.999));
    }
}
