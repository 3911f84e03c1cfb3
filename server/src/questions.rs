//! The fixed question set

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub statement: String,
    pub truth: bool,
}

impl Question {
    pub fn new(statement: impl Into<String>, truth: bool) -> Self {
        Self {
            statement: statement.into(),
            truth,
        }
    }
}

/// Geography statements, asked in this order every session
pub fn geography() -> Vec<Question> {
    [
        ("The capital city of Japan is Tokyo", true),
        ("The Amazon River is the longest river in the world", false),
        ("The Great Wall of China is the longest wall in the world", true),
        ("The Sahara Desert is the largest hot desert in the world", true),
        ("The tallest mountain in the world is Mount Everest", true),
        ("The largest country in the world by land area is Russia", true),
        ("The city of Rome is located in France", false),
        ("The Nile River is the longest river in the world", false),
        ("The Eiffel Tower is located in London", false),
        ("The Dead Sea is the saltiest body of water in the world", true),
        ("The Statue of Liberty was a gift from France to the United States", true),
        ("The Sydney Opera House is located in Australia", true),
        ("The capital city of Canada is Ottawa", true),
        ("The Sahara Desert is located in South America", false),
        ("The largest ocean in the world is the Pacific Ocean", true),
        ("The city of Moscow is the capital of Russia", true),
        ("The Great Barrier Reef is located in the Indian Ocean", false),
        ("The city of Berlin is the capital of Germany", true),
        ("The Panama Canal connects the Pacific Ocean to the Atlantic Ocean", true),
        ("The highest waterfall in the world is Angel Falls", true),
    ]
    .into_iter()
    .map(|(statement, truth)| Question::new(statement, truth))
    .collect()
}
