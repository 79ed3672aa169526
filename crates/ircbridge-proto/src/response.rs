//! Numeric replies a client needs to recognise.
//!
//! Names follow RFC 2812 and the IRCv3 SASL specification.

#![allow(missing_docs)]

pub const RPL_WELCOME: u16 = 1;
pub const RPL_WHOISREGNICK: u16 = 307;
pub const RPL_ENDOFWHOIS: u16 = 318;
pub const RPL_WHOISACCOUNT: u16 = 330;

pub const ERR_NOSUCHNICK: u16 = 401;
pub const ERR_NOSUCHCHANNEL: u16 = 403;
pub const ERR_TOOMANYCHANNELS: u16 = 405;
pub const ERR_ERRONEUSNICKNAME: u16 = 432;
pub const ERR_NICKNAMEINUSE: u16 = 433;
pub const ERR_CHANNELISFULL: u16 = 471;
pub const ERR_INVITEONLYCHAN: u16 = 473;
pub const ERR_BANNEDFROMCHAN: u16 = 474;
pub const ERR_BADCHANNELKEY: u16 = 475;

pub const RPL_LOGGEDIN: u16 = 900;
pub const RPL_SASLSUCCESS: u16 = 903;
pub const ERR_SASLFAIL: u16 = 904;
pub const ERR_SASLTOOLONG: u16 = 905;
pub const ERR_SASLABORTED: u16 = 906;
pub const ERR_SASLALREADY: u16 = 907;

/// Numerics that report a failed JOIN; the channel is the second parameter.
pub const JOIN_FAILURES: [u16; 6] = [
    ERR_NOSUCHCHANNEL,
    ERR_TOOMANYCHANNELS,
    ERR_CHANNELISFULL,
    ERR_INVITEONLYCHAN,
    ERR_BANNEDFROMCHAN,
    ERR_BADCHANNELKEY,
];

/// Numerics that terminate a SASL exchange unsuccessfully.
pub const SASL_FAILURES: [u16; 4] = [ERR_SASLFAIL, ERR_SASLTOOLONG, ERR_SASLABORTED, ERR_SASLALREADY];
