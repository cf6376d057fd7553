//! Built-in question banks used when AI generation is unavailable: one per
//! region, plus place-independent topic trivia.
//!
//! Entries are authored as (question, options, correct answer text) and are
//! normalized once to index-based `QuizQuestion`s so every question source
//! scores the same way.

use tracing::warn;

use crate::domain::{Difficulty, QuizQuestion, TriviaCategory, OPTIONS_PER_QUESTION};

struct Entry {
  question: &'static str,
  options: [&'static str; OPTIONS_PER_QUESTION],
  answer: &'static str,
}

const fn q(question: &'static str, options: [&'static str; OPTIONS_PER_QUESTION], answer: &'static str) -> Entry {
  Entry { question, options, answer }
}

/// What a place is matched on.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BankKey<'a> {
  pub name: &'a str,
  pub display_name: Option<&'a str>,
  pub country: Option<&'a str>,
}

impl<'a> BankKey<'a> {
  /// The explicit country, else the last comma segment of the display name
  /// (or of the name). Geocoder display names end with the country.
  fn country_component(&self) -> &'a str {
    let present = |s: &&'a str| !s.trim().is_empty();
    self.country
      .filter(present)
      .or_else(|| self.display_name.filter(present))
      .unwrap_or(self.name)
      .rsplit(',')
      .next()
      .unwrap_or_default()
      .trim()
  }
}

/// Which part of a place a region's keywords are checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
  /// Substring of the name or display name (cities, states).
  Place,
  /// Leading words of the country component, so "Indiana" is not India and
  /// "South America" is not the USA.
  Country,
}

/// One region of the bank: matching keywords plus its questions.
#[derive(Clone, Debug)]
pub struct RegionBank {
  pub name: &'static str,
  pub scope: Scope,
  pub keywords: &'static [&'static str],
  pub questions: Vec<QuizQuestion>,
}

fn words(s: &str) -> Vec<String> {
  s.to_lowercase()
    .split(|c: char| !c.is_alphanumeric())
    .filter(|t| !t.is_empty())
    .map(str::to_string)
    .collect()
}

impl RegionBank {
  fn matches(&self, key: &BankKey<'_>) -> bool {
    match self.scope {
      Scope::Place => {
        let name = key.name.to_lowercase();
        let display = key.display_name.unwrap_or_default().to_lowercase();
        self.keywords.iter().any(|k| name.contains(k) || display.contains(k))
      }
      Scope::Country => {
        let country = words(key.country_component());
        self.keywords.iter().any(|k| country.starts_with(&words(k)))
      }
    }
  }
}

/// Immutable bank; built once at startup and shared by reference.
#[derive(Clone, Debug)]
pub struct StaticQuestionBank {
  regions: Vec<RegionBank>,
  generic: RegionBank,
  topics: Vec<(TriviaCategory, Vec<QuizQuestion>)>,
}

impl Default for StaticQuestionBank {
  fn default() -> Self {
    Self::builtin()
  }
}

impl StaticQuestionBank {
  pub fn builtin() -> Self {
    let regions = REGIONS.iter()
      .map(|(name, scope, keywords, entries)| region(name, *scope, keywords, entries))
      .collect();
    let topics = TOPICS.iter()
      .map(|(category, entries)| (*category, normalize(category.display_name(), entries)))
      .collect();
    Self { regions, generic: region("General", Scope::Place, &[], GENERIC), topics }
  }

  /// First region (in priority order) matching the place, else the generic bank.
  pub fn region_for(&self, key: &BankKey<'_>) -> &RegionBank {
    self.regions.iter().find(|r| r.matches(key)).unwrap_or(&self.generic)
  }

  /// Up to `count` questions for the place; truncated, never padded or repeated.
  pub fn select(&self, key: &BankKey<'_>, count: usize) -> (&'static str, Vec<QuizQuestion>) {
    let region = self.region_for(key);
    (region.name, region.questions.iter().take(count).cloned().collect())
  }

  /// Up to `count` topic trivia questions.
  pub fn trivia(&self, category: TriviaCategory, count: usize) -> Vec<QuizQuestion> {
    self.topics.iter()
      .find(|(c, _)| *c == category)
      .map(|(_, qs)| qs.iter().take(count).cloned().collect())
      .unwrap_or_default()
  }
}

fn normalize(bank: &'static str, entries: &[Entry]) -> Vec<QuizQuestion> {
  entries.iter()
    .filter_map(|e| {
      let Some(idx) = e.options.iter().position(|o| *o == e.answer) else {
        warn!(target: "quiz", bank, question = e.question, "Bank entry answer not among options; skipped");
        return None;
      };
      Some(QuizQuestion {
        question_text: e.question.to_string(),
        options: e.options.iter().map(|o| o.to_string()).collect(),
        correct_option_index: idx,
        explanation: format!("The correct answer is {}.", e.answer),
        difficulty: Difficulty::Medium,
      })
    })
    .collect()
}

fn region(name: &'static str, scope: Scope, keywords: &'static [&'static str], entries: &[Entry]) -> RegionBank {
  RegionBank { name, scope, keywords, questions: normalize(name, entries) }
}

type RegionDef = (&'static str, Scope, &'static [&'static str], &'static [Entry]);

// Priority order: first match wins.
const REGIONS: &[RegionDef] = &[
  ("Pune", Scope::Place, &["pune", "poona"], PUNE),
  ("Mumbai", Scope::Place, &["mumbai", "bombay"], MUMBAI),
  ("Delhi", Scope::Place, &["delhi"], DELHI),
  ("Bangalore", Scope::Place, &["bangalore", "bengaluru"], BANGALORE),
  ("Maharashtra", Scope::Place, &["maharashtra"], MAHARASHTRA),
  ("India", Scope::Country, &["india", "bharat"], INDIA),
  ("London", Scope::Place, &["london"], LONDON),
  ("Paris", Scope::Place, &["paris"], PARIS),
  ("New York", Scope::Place, &["new york"], NEW_YORK),
  ("Tokyo", Scope::Place, &["tokyo"], TOKYO),
  ("USA", Scope::Country, &["usa", "united states", "america"], USA),
  ("UK", Scope::Country, &["uk", "united kingdom", "britain", "great britain", "england"], UK),
  ("France", Scope::Country, &["france"], FRANCE),
  ("Japan", Scope::Country, &["japan"], JAPAN),
];

const TOPICS: &[(TriviaCategory, &[Entry])] = &[
  (TriviaCategory::Geography, GEOGRAPHY),
  (TriviaCategory::History, HISTORY),
  (TriviaCategory::GeneralKnowledge, GENERAL_KNOWLEDGE),
];

const PUNE: &[Entry] = &[
  q("What is Pune historically known as?", ["Poona", "Punaka", "Punyapura", "Puneri"], "Poona"),
  q("Poona was the seat of the Peshwas, prime ministers of which empire?", ["Mughal Empire", "Maratha Empire", "British Empire", "Vijayanagara Empire"], "Maratha Empire"),
  q("Who is credited with founding the city of Pune?", ["Chhatrapati Shivaji", "Chhatrapati Shahu", "Balaji Bajirao", "Shahaji Bhosale"], "Shahaji Bhosale"),
  q("Which river flows through Pune?", ["Godavari", "Krishna", "Mutha", "Tapi"], "Mutha"),
  q("Pune is known as the 'Oxford of the East' because of its:", ["Historical monuments", "Educational institutions", "IT companies", "Cultural heritage"], "Educational institutions"),
  q("The Aga Khan Palace in Pune is a memorial to which leader?", ["Jawaharlal Nehru", "Mahatma Gandhi", "Subhas Chandra Bose", "Bal Gangadhar Tilak"], "Mahatma Gandhi"),
  q("The Pataleshwar cave temple in Pune is dedicated to which deity?", ["Vishnu", "Ganesha", "Shiva", "Durga"], "Shiva"),
];

const MUMBAI: &[Entry] = &[
  q("Mumbai was previously known as:", ["Bombay", "Bambai", "Bom Bahia", "Mumbadevi"], "Bombay"),
  q("When did Bombay officially become Mumbai?", ["1995", "1996", "1997", "1998"], "1995"),
  q("Mumbai is named after which goddess?", ["Mahalakshmi", "Mumbadevi", "Durga", "Saraswati"], "Mumbadevi"),
  q("How many islands was Mumbai originally built on?", ["5", "6", "7", "8"], "7"),
  q("The Gateway of India commemorates the visit of which British monarch?", ["Queen Victoria", "King George V", "King Edward VII", "Queen Elizabeth I"], "King George V"),
];

const DELHI: &[Entry] = &[
  q("How many cities are traditionally said to have stood in the area of present-day Delhi?", ["5", "7", "9", "11"], "7"),
  q("When was New Delhi inaugurated as India's capital?", ["1911", "1931", "1947", "1950"], "1931"),
  q("According to legend, Delhi is named after which king?", ["Raja Dhilu", "Emperor Humayun", "Prithviraj Chauhan", "Bahadur Shah"], "Raja Dhilu"),
  q("Which river flows through Delhi?", ["Ganga", "Yamuna", "Saraswati", "Gomti"], "Yamuna"),
  q("The Red Fort was built by which Mughal emperor?", ["Akbar", "Shah Jahan", "Humayun", "Aurangzeb"], "Shah Jahan"),
];

const BANGALORE: &[Entry] = &[
  q("Bangalore was founded by which ruler?", ["Tipu Sultan", "Kempe Gowda", "Hyder Ali", "Krishnadevaraya"], "Kempe Gowda"),
  q("In which year was Bangalore founded?", ["1537", "1547", "1557", "1567"], "1537"),
  q("According to popular legend, what does 'Bengaluru' mean?", ["City of Gardens", "Town of Boiled Beans", "Land of Warriors", "Place of Kings"], "Town of Boiled Beans"),
  q("Bangalore is popularly known as the:", ["Garden City", "Silicon Valley of India", "IT Capital", "All of the above"], "All of the above"),
  q("In which year was the city's name officially changed to Bengaluru?", ["2006", "2014", "2008", "2009"], "2014"),
];

const MAHARASHTRA: &[Entry] = &[
  q("Maharashtra was formed on which date?", ["May 1, 1960", "May 1, 1961", "April 1, 1960", "June 1, 1960"], "May 1, 1960"),
  q("What does 'Maharashtra' mean?", ["Great Nation", "Land of Marathas", "Great State", "Land of Warriors"], "Great Nation"),
  q("Who is considered the founder of the Maratha Empire?", ["Shivaji Maharaj", "Sambhaji", "Rajaram", "Shahu"], "Shivaji Maharaj"),
  q("Which is the state animal of Maharashtra?", ["Tiger", "Leopard", "Giant Squirrel", "Sambhar"], "Giant Squirrel"),
  q("Maharashtra Day is celebrated on:", ["May 1", "March 30", "April 14", "June 1"], "May 1"),
];

const INDIA: &[Entry] = &[
  q("When did India gain independence?", ["August 15, 1947", "August 15, 1946", "July 15, 1947", "September 15, 1947"], "August 15, 1947"),
  q("The name 'India' is derived from which river?", ["Ganga", "Indus", "Yamuna", "Brahmaputra"], "Indus"),
  q("How many states are there in India currently?", ["28", "29", "30", "31"], "28"),
  q("Which city was the capital of British India before Delhi?", ["Delhi", "Mumbai", "Kolkata", "Chennai"], "Kolkata"),
  q("The name 'Bharat' comes from which legendary king?", ["King Bharata", "King Ashoka", "King Vikramaditya", "King Dushyanta"], "King Bharata"),
];

const LONDON: &[Entry] = &[
  q("London was founded by which ancient civilization?", ["Romans", "Saxons", "Vikings", "Celts"], "Romans"),
  q("What was London originally called?", ["Londinium", "Lundenwic", "Londonium", "Lundinium"], "Londinium"),
  q("Around which year was Roman London founded?", ["43 AD", "47 AD", "50 AD", "55 AD"], "47 AD"),
  q("When did the Great Fire of London occur?", ["1665", "1666", "1667", "1668"], "1666"),
];

const PARIS: &[Entry] = &[
  q("Paris gets its name from which ancient tribe?", ["Parisii", "Parisi", "Gallic", "Belgae"], "Parisii"),
  q("When was the Eiffel Tower completed?", ["1887", "1888", "1889", "1890"], "1889"),
  q("What was Paris called in Roman times?", ["Lutetia", "Parisia", "Lutecia", "Parisiorum"], "Lutetia"),
  q("Paris is built around which river?", ["Loire", "Seine", "Rhone", "Garonne"], "Seine"),
  q("How many arrondissements (districts) does Paris have?", ["18", "19", "20", "21"], "20"),
];

const NEW_YORK: &[Entry] = &[
  q("New York was originally called:", ["New Amsterdam", "New Holland", "New England", "New Britain"], "New Amsterdam"),
  q("Who founded New Amsterdam (now New York)?", ["British", "Dutch", "French", "Spanish"], "Dutch"),
  q("In which year was New Amsterdam renamed New York?", ["1664", "1665", "1666", "1667"], "1664"),
  q("New York was named after which Duke?", ["Duke of York", "Duke of Cambridge", "Duke of Sussex", "Duke of Kent"], "Duke of York"),
];

const TOKYO: &[Entry] = &[
  q("Tokyo was previously known as:", ["Edo", "Kyoto", "Osaka", "Yokohama"], "Edo"),
  q("When was Edo renamed Tokyo?", ["1867", "1868", "1869", "1870"], "1868"),
  q("What does 'Tokyo' mean?", ["Eastern Capital", "Great City", "Imperial City", "New Capital"], "Eastern Capital"),
  q("The Tokyo Imperial Palace stands on the site of:", ["Edo Castle", "Kyoto Palace", "Osaka Castle", "Himeji Castle"], "Edo Castle"),
];

const USA: &[Entry] = &[
  q("In which year was the US Declaration of Independence signed?", ["1775", "1776", "1777", "1778"], "1776"),
  q("How many original colonies formed the United States?", ["12", "13", "14", "15"], "13"),
  q("'America' derives its name from:", ["Amerigo Vespucci", "Christopher Columbus", "John America", "A Native American word"], "Amerigo Vespucci"),
];

const UK: &[Entry] = &[
  q("The Acts of Union that created Great Britain were passed in:", ["1603", "1707", "1801", "1922"], "1707"),
  q("Which river flows through London?", ["Severn", "Thames", "Trent", "Mersey"], "Thames"),
];

const FRANCE: &[Entry] = &[
  q("France gets its name from which ancient people?", ["Franks", "Gauls", "Celts", "Romans"], "Franks"),
  q("When did the French Revolution begin?", ["1789", "1790", "1791", "1792"], "1789"),
];

const JAPAN: &[Entry] = &[
  q("What is Japan called in Japanese?", ["Nippon/Nihon", "Yamato", "Wa", "Akitsushima"], "Nippon/Nihon"),
  q("What does 'Nihon' mean?", ["Land of Rising Sun", "Island Nation", "Great Harmony", "Divine Country"], "Land of Rising Sun"),
];

const GENERIC: &[Entry] = &[
  q("Most ancient cities were built near:", ["Mountains", "Rivers", "Deserts", "Forests"], "Rivers"),
  q("The suffix '-pur' in Indian city names usually means:", ["City", "Village", "Fort", "Market"], "City"),
  q("Ancient settlements were typically established based on:", ["Water availability", "Trade routes", "Defense advantages", "All of the above"], "All of the above"),
  q("What is the capital of Australia?", ["Sydney", "Melbourne", "Canberra", "Perth"], "Canberra"),
  q("Mount Everest is located in which mountain range?", ["Andes", "Alps", "Himalayas", "Rockies"], "Himalayas"),
  q("The Berlin Wall fell in which year?", ["1987", "1988", "1989", "1990"], "1989"),
  q("What is the largest ocean on Earth?", ["Atlantic", "Indian", "Arctic", "Pacific"], "Pacific"),
];

const GEOGRAPHY: &[Entry] = &[
  q("What is the capital of Australia?", ["Sydney", "Melbourne", "Canberra", "Perth"], "Canberra"),
  q("Which is the longest river in the world?", ["Amazon", "Nile", "Mississippi", "Yangtze"], "Nile"),
  q("Mount Everest is located in which mountain range?", ["Andes", "Alps", "Himalayas", "Rockies"], "Himalayas"),
  q("Which desert is the largest in the world?", ["Sahara", "Gobi", "Antarctic", "Arabian"], "Antarctic"),
  q("What is the smallest country in the world?", ["Monaco", "Vatican City", "San Marino", "Liechtenstein"], "Vatican City"),
];

const HISTORY: &[Entry] = &[
  q("In which year did World War II end?", ["1944", "1945", "1946", "1947"], "1945"),
  q("Who was the first person to walk on the moon?", ["Buzz Aldrin", "Neil Armstrong", "John Glenn", "Alan Shepard"], "Neil Armstrong"),
  q("The ancient city of Troy was located in which modern-day country?", ["Greece", "Italy", "Turkey", "Egypt"], "Turkey"),
  q("Which empire was ruled by Julius Caesar?", ["Greek Empire", "Roman Empire", "Persian Empire", "Byzantine Empire"], "Roman Empire"),
  q("The Berlin Wall fell in which year?", ["1987", "1988", "1989", "1990"], "1989"),
];

const GENERAL_KNOWLEDGE: &[Entry] = &[
  q("What is the largest planet in our solar system?", ["Saturn", "Jupiter", "Neptune", "Earth"], "Jupiter"),
  q("Which element has the chemical symbol 'O'?", ["Gold", "Silver", "Oxygen", "Iron"], "Oxygen"),
  q("What is the fastest land animal?", ["Lion", "Cheetah", "Leopard", "Tiger"], "Cheetah"),
  q("How many continents are there?", ["5", "6", "7", "8"], "7"),
  q("What is the largest ocean on Earth?", ["Atlantic", "Indian", "Arctic", "Pacific"], "Pacific"),
];
