use crate::classify::Category;

/// One named set of recognized identifiers sharing a highlighting category.
/// Sigil sets hold canonical names; the classifier derives the `@`-prefixed,
/// hyphenated source form while building the rule table.
#[derive(Debug, PartialEq)]
pub struct VocabularySet {
    pub words: &'static [&'static str],
    pub category: Category,
    pub sigil: bool,
}

#[derive(Debug, PartialEq)]
pub struct Syntax {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    pub single_line_comment: Option<char>,
    pub jump_instruction: Option<&'static str>,
    pub vocabulary: &'static [VocabularySet],
    pub flags: u32,
}

pub const HIGHLIGHT_NUMBERS: u32 = 1 << 0;
pub const HIGHLIGHT_STRINGS: u32 = 1 << 1;

/// Processor instructions.
const INSTRUCTIONS: &[&str] = &[
    "read", "write", "draw", "print", "drawflush", "printflush", "getlink",
    "control", "radar", "sensor", "set", "op", "lookup", "packcolor", "wait",
    "stop", "end", "jump", "ubind", "ucontrol", "uradar", "ulocate", "noop",
];

/// `op` operators, also used as `jump` conditions.
const OPERATIONS: &[&str] = &[
    "add", "sub", "mul", "div", "idiv", "mod", "pow", "equal", "notEqual",
    "land", "lessThan", "lessThanEq", "greaterThan", "greaterThanEq",
    "strictEqual", "always", "shl", "shr", "or", "and", "xor", "not", "max",
    "min", "angle", "angleDiff", "len", "noise", "abs", "log", "log10",
    "floor", "ceil", "sqrt", "rand", "sin", "cos", "tan", "asin", "acos",
    "atan",
];

/// Sub-words of the compound instructions: `draw` shapes, `control` and
/// `ucontrol` verbs, `radar` filters and sort keys, `lookup` and `ulocate`
/// kinds.
const SUBCOMMANDS: &[&str] = &[
    // draw
    "clear", "color", "col", "stroke", "line", "rect", "lineRect", "poly",
    "linePoly", "triangle", "image",
    // control
    "enabled", "shoot", "shootp", "config",
    // radar
    "any", "enemy", "ally", "player", "attacker", "flying", "boss", "ground",
    "distance", "health", "shield", "armor", "maxHealth",
    // lookup
    "block", "unit", "item", "liquid",
    // ucontrol
    "idle", "move", "approach", "boost", "pathfind", "target", "targetp",
    "itemDrop", "itemTake", "payDrop", "payTake", "payEnter", "mine", "flag",
    "build", "getBlock", "within", "unbind",
    // ulocate
    "ore", "building", "spawn", "damaged", "core", "storage", "generator",
    "turret", "factory", "repair", "battery", "reactor",
];

/// Symbols the processor exposes with an `@` sigil: global counters and
/// links, sensable properties, items and liquids.
const BUILTIN_VARIABLES: &[&str] = &[
    // globals
    "counter", "this", "thisx", "thisy", "ipt", "links", "unit", "time",
    "tick", "second", "minute", "waveNumber", "waveTime", "mapw", "maph",
    "blockCount", "unitCount", "itemCount", "liquidCount", "ctrlProcessor",
    "ctrlPlayer", "ctrlCommand", "solid", "air",
    // sensable properties
    "totalItems", "firstItem", "totalLiquids", "totalPower", "itemCapacity",
    "liquidCapacity", "powerCapacity", "powerNetStored", "powerNetCapacity",
    "powerNetIn", "powerNetOut", "ammo", "ammoCapacity", "health",
    "maxHealth", "heat", "efficiency", "progress", "timescale", "rotation",
    "x", "y", "shootX", "shootY", "size", "dead", "range", "shooting",
    "boosting", "mineX", "mineY", "mining", "speed", "team", "type", "flag",
    "controlled", "controller", "name", "payloadCount", "payloadType",
    "enabled", "config", "color",
    // items
    "copper", "lead", "metaglass", "graphite", "sand", "coal", "titanium",
    "thorium", "scrap", "silicon", "plastanium", "phase fabric",
    "surge alloy", "spore pod", "blast compound", "pyratite",
    // liquids
    "water", "slag", "oil", "cryofluid",
];

const CONSTANTS: &[&str] = &["true", "false", "null"];

const UNIT_TYPES: &[&str] = &[
    "dagger", "mace", "fortress", "scepter", "reign", "nova", "pulsar",
    "quasar", "vela", "corvus", "crawler", "atrax", "spiroct", "arkyid",
    "toxopid", "flare", "horizon", "zenith", "antumbra", "eclipse", "mono",
    "poly", "mega", "quad", "oct", "risso", "minke", "bryde", "sei", "omura",
    "retusa", "oxynoe", "cyerce", "aedi", "navanax", "alpha", "beta", "gamma",
];

/// Building names in their canonical multi-word form; the table-build
/// transform turns "copper wall large" into the `@copper-wall-large` token.
const BLOCK_TYPES: &[&str] = &[
    "graphite press", "multi press", "silicon smelter", "silicon crucible",
    "kiln", "plastanium compressor", "phase weaver", "surge smelter",
    "cryofluid mixer", "pyratite mixer", "blast mixer", "melter",
    "separator", "disassembler", "spore press", "pulverizer",
    "coal centrifuge", "incinerator", "copper wall", "copper wall large",
    "titanium wall", "titanium wall large", "plastanium wall",
    "plastanium wall large", "thorium wall", "thorium wall large",
    "phase wall", "phase wall large", "surge wall", "surge wall large",
    "door", "door large", "scrap wall", "scrap wall large", "scrap wall huge",
    "scrap wall gigantic", "mender", "mend projector", "overdrive projector",
    "overdrive dome", "force projector", "shock mine", "conveyor",
    "titanium conveyor", "plastanium conveyor", "armored conveyor",
    "junction", "bridge conveyor", "phase conveyor", "sorter",
    "inverted sorter", "router", "distributor", "overflow gate",
    "underflow gate", "mass driver", "duct", "duct router", "duct bridge",
    "mechanical pump", "rotary pump", "thermal pump", "conduit",
    "pulse conduit", "plated conduit", "liquid router", "liquid tank",
    "liquid junction", "bridge conduit", "phase conduit", "power node",
    "power node large", "surge tower", "diode", "battery", "battery large",
    "combustion generator", "thermal generator", "steam generator",
    "differential generator", "rtg generator", "solar panel",
    "solar panel large", "thorium reactor", "impact reactor",
    "mechanical drill", "pneumatic drill", "laser drill", "blast drill",
    "water extractor", "cultivator", "oil extractor", "core shard",
    "core foundation", "core nucleus", "vault", "container", "unloader",
    "duo", "scatter", "scorch", "hail", "wave", "lancer", "arc", "parallax",
    "swarmer", "salvo", "segment", "tsunami", "fuse", "ripple", "cyclone",
    "foreshadow", "spectre", "meltdown", "ground factory", "air factory",
    "naval factory", "additive reconstructor", "multiplicative reconstructor",
    "exponential reconstructor", "tetrative reconstructor", "repair point",
    "repair turret", "payload conveyor", "payload router",
    "payload propulsion tower", "power source", "power void", "item source",
    "item void", "liquid source", "liquid void", "payload source",
    "payload void", "illuminator", "launch pad",
    "interplanetary accelerator", "message", "switch", "micro processor",
    "logic processor", "hyper processor", "memory cell", "memory bank",
    "logic display", "large logic display",
];

// Rule order is significant: a word in two sets keeps the category of the
// earlier one. "stop" is both an instruction and a ucontrol sub-word and
// must stay a keyword.
pub const SYNTAX_MLOG: Syntax = Syntax {
    name: "mlog",
    extensions: &[".mlog", ".masm"],
    single_line_comment: Some('#'),
    jump_instruction: Some("jump"),
    vocabulary: &[
        VocabularySet {
            words: INSTRUCTIONS,
            category: Category::Keyword,
            sigil: false,
        },
        VocabularySet {
            words: BUILTIN_VARIABLES,
            category: Category::Variable,
            sigil: true,
        },
        VocabularySet {
            words: CONSTANTS,
            category: Category::Constant,
            sigil: false,
        },
        VocabularySet {
            words: OPERATIONS,
            category: Category::Builtin,
            sigil: false,
        },
        VocabularySet {
            words: SUBCOMMANDS,
            category: Category::Builtin,
            sigil: false,
        },
        VocabularySet {
            words: UNIT_TYPES,
            category: Category::Type,
            sigil: true,
        },
        VocabularySet {
            words: BLOCK_TYPES,
            category: Category::Type,
            sigil: true,
        },
    ],
    flags: HIGHLIGHT_NUMBERS | HIGHLIGHT_STRINGS,
};

pub const SYNTAXES: &[Syntax] = &[SYNTAX_MLOG];
