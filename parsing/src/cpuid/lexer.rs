use nom::bytes::complete::{tag, take_while_m_n};
use nom::character::complete::{char, one_of, space1};
use nom::combinator::{map_res, opt};
use nom::error::{Error, ErrorKind};
use nom::sequence::{preceded, terminated, tuple};
use nom::IResult;

/// A single `CPUID` line, before subleaf numbering is resolved
#[derive(Debug, PartialEq)]
pub struct RegisterLine<'a> {
    pub leaf: u32,
    /// Set when the line names its subleaf, either as `CPUID 00000004.01:` or with an `[SL 01]` comment
    pub subleaf: Option<u32>,
    /// eax, ebx, ecx, edx in that order
    pub registers: [u32; 4],
    /// Whatever was inside the trailing brackets, AIDA puts the ascii form of the registers here
    pub comment: Option<&'a str>,
}

/// Register lines look like `CPUID 00000000: 0000000D-756E6547-6C65746E-49656E69 [GenuineIntel]`.
/// Only a full 8 digit leaf followed by `:` or `.` counts, the `CPUID CPU Name : ...` style
/// summary lines also start with hex letters.
pub fn is_register_line(line: &str) -> bool {
    let candidate: IResult<&str, &str> = preceded(
        tag("CPUID "),
        terminated(
            take_while_m_n(8, 8, |c: char| c.is_ascii_hexdigit()),
            one_of(":."),
        ),
    )(line);
    candidate.is_ok()
}

/// Read one register line. The input is expected to be a single line with surrounding whitespace trimmed.
pub fn read_register_line(input: &str) -> IResult<&str, RegisterLine<'_>> {
    let (remainder, (leaf, explicit_subleaf)) = terminated(
        preceded(
            tag("CPUID "),
            tuple((hex_u32, opt(preceded(char('.'), short_hex_u32)))),
        ),
        char(':'),
    )(input)?;
    let (remainder, registers) = preceded(space1, read_registers)(remainder)?;

    // anything after the registers has to be a bracketed comment
    let trailing = remainder.trim();
    let comment = if trailing.is_empty() {
        None
    } else {
        let inner = trailing
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .ok_or_else(|| nom::Err::Error(Error::new(remainder, ErrorKind::Verify)))?;
        Some(inner)
    };

    let subleaf = explicit_subleaf
        .or_else(|| comment.and_then(|c| read_subleaf_comment(c).ok().map(|o| o.1)));
    Ok((
        "",
        RegisterLine {
            leaf,
            subleaf,
            registers,
            comment,
        },
    ))
}

/// `eax-ebx-ecx-edx`, each as 8 hex digits
fn read_registers(input: &str) -> IResult<&str, [u32; 4]> {
    let (remainder, (eax, ebx, ecx, edx)) = tuple((
        hex_u32,
        preceded(char('-'), hex_u32),
        preceded(char('-'), hex_u32),
        preceded(char('-'), hex_u32),
    ))(input)?;
    Ok((remainder, [eax, ebx, ecx, edx]))
}

/// Subleaf comments are formatted as `SL 01`
fn read_subleaf_comment(input: &str) -> IResult<&str, u32> {
    preceded(tag("SL "), short_hex_u32)(input)
}

fn hex_u32(input: &str) -> IResult<&str, u32> {
    map_res(take_while_m_n(8, 8, |c: char| c.is_ascii_hexdigit()), |s| {
        u32::from_str_radix(s, 16)
    })(input)
}

fn short_hex_u32(input: &str) -> IResult<&str, u32> {
    map_res(take_while_m_n(1, 8, |c: char| c.is_ascii_hexdigit()), |s| {
        u32::from_str_radix(s, 16)
    })(input)
}
