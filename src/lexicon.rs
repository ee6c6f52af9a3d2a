//! Fixed word lists used by the default analyzer and the session defaults

/// Keywords that mark a mention as something the user likes
pub const LIKE_KEYWORDS: &[&str] = &[
    "love",
    "loves",
    "loved",
    "like",
    "likes",
    "adore",
    "adores",
    "enjoy",
    "enjoys",
    "favorite",
    "favourite",
    "prefer",
    "fond of",
    "obsessed with",
];

/// Keywords that mark a mention as something the user dislikes
pub const DISLIKE_KEYWORDS: &[&str] = &[
    "hate",
    "hates",
    "hated",
    "dislike",
    "dislikes",
    "despise",
    "loathe",
    "detest",
    "can't stand",
    "cannot stand",
    "sick of",
];

/// Narrative motifs tracked across assistant replies
pub const MOTIFS: &[&str] = &[
    "lantern", "shrine", "tears", "ink", "wind", "spirit", "shadow", "moon", "raven", "candle",
    "rain", "mirror", "rose", "ghost",
];

/// Word valences on a -4..4 scale
pub const VALENCE: &[(&str, f32)] = &[
    ("love", 3.2),
    ("loved", 2.9),
    ("adore", 2.9),
    ("like", 1.5),
    ("enjoy", 2.2),
    ("favorite", 2.0),
    ("favourite", 2.0),
    ("beautiful", 2.9),
    ("wonderful", 2.7),
    ("amazing", 2.8),
    ("awesome", 3.1),
    ("great", 3.1),
    ("good", 1.9),
    ("nice", 1.8),
    ("happy", 2.7),
    ("glad", 2.0),
    ("fun", 2.3),
    ("excited", 2.2),
    ("cool", 1.3),
    ("fascinating", 2.1),
    ("haunting", 0.6),
    ("peaceful", 2.2),
    ("cozy", 1.9),
    ("thanks", 1.9),
    ("thank", 1.5),
    ("perfect", 2.7),
    ("brilliant", 2.8),
    ("delighted", 2.7),
    ("hate", -2.7),
    ("hated", -3.2),
    ("dislike", -1.6),
    ("despise", -2.9),
    ("loathe", -2.6),
    ("terrible", -2.1),
    ("awful", -2.0),
    ("horrible", -2.5),
    ("worst", -3.1),
    ("bad", -2.5),
    ("boring", -1.3),
    ("noisy", -0.7),
    ("annoying", -1.7),
    ("sad", -2.1),
    ("lonely", -1.5),
    ("alone", -1.0),
    ("afraid", -1.9),
    ("scared", -1.9),
    ("anxious", -1.0),
    ("angry", -2.3),
    ("tired", -1.0),
    ("miserable", -2.2),
    ("depressed", -2.3),
    ("ugly", -2.0),
    ("cruel", -2.8),
    ("painful", -2.2),
    ("hurt", -2.4),
    ("cry", -2.1),
    ("grief", -2.2),
    ("sorrow", -2.4),
    ("disappointing", -2.2),
    ("frustrated", -2.1),
];

/// Words that intensify the next valence word
pub const BOOSTERS: &[&str] = &[
    "really",
    "very",
    "so",
    "extremely",
    "absolutely",
    "totally",
    "incredibly",
    "deeply",
    "truly",
    "utterly",
];

/// Words that flip the polarity of a valence word that follows within three tokens
pub const NEGATIONS: &[&str] = &[
    "not", "never", "no", "nothing", "neither", "nor", "without", "cannot", "hardly",
];

/// Function words and filler verbs that never become memory keys
pub const STOPWORDS: &[&str] = &[
    "the", "and", "but", "for", "nor", "yet", "with", "about", "into", "onto", "from", "that",
    "this", "these", "those", "there", "here", "then", "than", "what", "which", "who", "whom",
    "whose", "when", "where", "why", "how", "you", "your", "yours", "yourself", "she", "her",
    "hers", "him", "his", "himself", "they", "them", "their", "theirs", "its", "our", "ours",
    "mine", "myself", "are", "was", "were", "been", "being", "have", "has", "had", "having",
    "does", "did", "doing", "done", "can", "could", "should", "would", "will", "shall", "may",
    "might", "must", "not", "never", "all", "any", "some", "each", "every", "more", "most",
    "much", "many", "very", "really", "just", "also", "too", "only", "even", "still", "again",
    "always", "often", "sometimes", "maybe", "perhaps", "because", "since", "while", "until",
    "after", "before", "over", "under", "through", "between", "something", "anything",
    "everything", "nothing", "someone", "anyone", "everyone", "thing", "things", "tell",
    "told", "think", "thought", "know", "knew", "want", "wanted", "make", "made", "get", "got",
    "going", "gone", "say", "said", "see", "saw", "seen", "feel", "felt", "let", "lets",
    "like", "love", "hate", "yes", "yeah", "okay", "hello", "hey", "please", "thanks",
    "thank", "well", "lot", "lots", "kind", "sort", "way", "one", "ones", "out", "off",
    "own", "same", "other", "another", "such", "back", "now", "today", "lately", "currently",
    "don't", "doesn't", "didn't", "i'm", "i've", "i'll", "i'd", "it's", "that's", "what's",
    "let's", "you're", "can't", "won't", "isn't", "wasn't", "aren't",
];

/// Look up the valence of a lowercase word
pub fn valence(word: &str) -> Option<f32> {
    VALENCE
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, v)| *v)
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

pub fn is_booster(word: &str) -> bool {
    BOOSTERS.contains(&word)
}

pub fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word) || word.ends_with("n't")
}

/// Words carrying affect rather than naming a thing
pub fn is_affect_word(word: &str) -> bool {
    valence(word).is_some()
        || LIKE_KEYWORDS.contains(&word)
        || DISLIKE_KEYWORDS.contains(&word)
}

/// Whole-word (or whole-phrase) match inside already-lowercased text
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    let is_word_char = |c: char| c.is_alphanumeric() || c == '\'';
    haystack.match_indices(phrase).any(|(start, _)| {
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !is_word_char(c));
        let after_ok = haystack[start + phrase.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_word_char(c));
        before_ok && after_ok
    })
}
