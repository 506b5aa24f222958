//! Built-in English stop list and stop-list parsing
//!
//! The default list covers articles, pronouns, prepositions, conjunctions,
//! auxiliaries and common verbs, frequent adverbs, numerals, and
//! abbreviations. Callers replace it wholesale by handing the engine a
//! string in the same format: whitespace-separated words, lines starting
//! with `#` are comments.

use std::collections::HashSet;

/// Default English stop list, in the same source format accepted for
/// caller-supplied replacements.
pub const DEFAULT_STOP_WORDS: &str = "\
# Articles and determiners
a an the this that these those such each every either neither both all any
some few many much more most other another same own several certain

# Pronouns
i me my myself mine we us our ours ourselves you your yours yourself
yourselves he him his himself she her hers herself it its itself they them
their theirs themselves who whom whose which what anybody anyone anything
everybody everyone everything nobody none nothing somebody someone
something oneself

# Prepositions
about above across after against along amid among around at before behind
below beneath beside besides between beyond by despite down during except
for from in inside into near of off on onto out outside over past per
since through throughout till to toward towards under underneath until
unto up upon via with within without

# Conjunctions
and but or nor so yet if because although though while whereas whether as
than unless once lest

# Auxiliaries and common verbs
am is are was were be been being have has had having do does did doing
can could may might must shall should will would ought dare need used
became become becomes becoming began begin begun bring brought call called
came come coming did find found get gets getting give given goes going
gone got keep kept knew know known let lets look looked made make makes
making mean meant motion move moved put puts said say says see seem seemed
seems seen show showed shown take taken takes tell think thought told took
turn turned use wanted want went work worked

# Adverbs and qualifiers
again ago almost alone already also always anywhere away back else
elsewhere enough even ever everywhere far further here how however indeed
instead just least less maybe meanwhile merely moreover namely nearly
never nevertheless new next no not now nowhere often only otherwise
perhaps quite rather really seldom sometime sometimes somewhat somewhere
soon still then thence there therefore thereupon thus today together
tomorrow too very when whence where whereafter whereby wherein whereupon
wherever whither why yes yesterday yet

# Numerals
one two three four five six seven eight nine ten eleven twelve twenty
thirty forty fifty sixty seventy eighty ninety hundred thousand million
billion first second third fourth fifth sixth seventh eighth ninth tenth
twice half dozen

# Abbreviations
co dr eg etc ie inc jr ltd mr mrs ms pm prof rd sr st vs viz
";

/// Parse a stop-list source string into a lowercased word set.
///
/// Words are whitespace-separated; a line whose first non-blank character
/// is `#` is skipped entirely.
pub fn parse_stop_list(source: &str) -> HashSet<String> {
    let mut words = HashSet::new();
    for line in source.lines() {
        if line.trim_start().starts_with('#') {
            continue;
        }
        for word in line.split_whitespace() {
            words.insert(word.to_lowercase());
        }
    }
    words
}
