use std::fmt;
use std::str::FromStr;

/// Educational background offered by the field picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Science,
    Commerce,
    Arts,
    Other,
}

const SCIENCE_FIELDS: [&str; 10] = [
    "Medicine & Healthcare",
    "Engineering",
    "Data Science & Analytics",
    "Research & Development",
    "Biotechnology",
    "Environmental Science",
    "Pharmacy",
    "Agriculture Science",
    "Forensic Science",
    "Space Technology",
];

const COMMERCE_FIELDS: [&str; 10] = [
    "Accounting & Finance",
    "Business Management",
    "Banking & Insurance",
    "Marketing & Sales",
    "Human Resources",
    "Supply Chain Management",
    "Entrepreneurship",
    "Economics & Policy",
    "Digital Marketing",
    "Investment Banking",
];

const ARTS_FIELDS: [&str; 10] = [
    "Journalism & Media",
    "Psychology & Counseling",
    "Education & Teaching",
    "Social Work",
    "Fine Arts & Design",
    "Literature & Writing",
    "History & Archaeology",
    "Political Science",
    "Languages & Translation",
    "Performing Arts",
];

const OTHER_FIELDS: [&str; 10] = [
    "Information Technology",
    "Hospitality & Tourism",
    "Sports & Fitness",
    "Fashion & Design",
    "Culinary Arts",
    "Aviation",
    "Defense Services",
    "Civil Services",
    "Law & Legal Services",
    "Real Estate",
];

impl Background {
    pub const ALL: [Background; 4] = [
        Background::Science,
        Background::Commerce,
        Background::Arts,
        Background::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Background::Science => "science",
            Background::Commerce => "commerce",
            Background::Arts => "arts",
            Background::Other => "other",
        }
    }

    pub fn career_fields(&self) -> &'static [&'static str] {
        match self {
            Background::Science => &SCIENCE_FIELDS,
            Background::Commerce => &COMMERCE_FIELDS,
            Background::Arts => &ARTS_FIELDS,
            Background::Other => &OTHER_FIELDS,
        }
    }
}

impl fmt::Display for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseBackgroundError {
    message: String,
}

impl fmt::Display for ParseBackgroundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseBackgroundError {}

impl FromStr for Background {
    type Err = ParseBackgroundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "science" => Ok(Background::Science),
            "commerce" => Ok(Background::Commerce),
            "arts" => Ok(Background::Arts),
            "other" => Ok(Background::Other),
            _ =>
                Err(ParseBackgroundError {
                    message: format!("Unknown background: '{}'", s),
                }),
        }
    }
}

/// Option value for a field name: lowercased, whitespace runs become `-`.
pub fn slug(field: &str) -> String {
    field.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

/// Question pre-filled into the chat input once a field is picked.
pub fn field_interest_prompt(background: Background, field: &str) -> String {
    format!(
        "I have a {} background and I'm interested in {}. \
         Can you provide detailed information about career opportunities, required education, \
         skills needed, salary expectations, growth prospects, and most importantly, \
         recommend specific entrance exams and competitive exams that can help me get into better colleges for this field?",
        background,
        field
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_background_lists_ten_fields() {
        for background in Background::ALL {
            assert_eq!(background.career_fields().len(), 10);
            assert_eq!(background.as_str().parse::<Background>(), Ok(background));
        }
        assert!("law".parse::<Background>().is_err());
    }

    #[test]
    fn slugs_field_names() {
        assert_eq!(slug("Data Science & Analytics"), "data-science-&-analytics");
        assert_eq!(slug("Aviation"), "aviation");
    }

    #[test]
    fn interest_prompt_names_background_and_field() {
        let prompt = field_interest_prompt(Background::Commerce, "Investment Banking");
        assert!(prompt.starts_with("I have a commerce background and I'm interested in Investment Banking. Can you"));
        assert!(prompt.ends_with("for this field?"));
    }
}
